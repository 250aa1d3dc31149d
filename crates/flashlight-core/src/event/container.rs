use std::sync::Arc;

use crate::event::dispatcher::EventDispatcher;
use crate::event::listener::Listener;
use crate::event::provider::{ListenerProvider, MethodTable};

/// A set of listeners switched on and off together.
///
/// Typical owners are feature modules that keep their listeners in a group
/// and call [`enable`](Self::enable) / [`disable`](Self::disable) when the
/// module is toggled.
#[derive(Debug, Default, Clone)]
pub struct ListenerGroup {
    listeners: Vec<Listener>,
}

impl ListenerGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `listener` and hand back a handle to it
    pub fn add(&mut self, listener: Listener) -> Listener {
        self.listeners.push(listener.clone());
        listener
    }

    pub fn extend<I: IntoIterator<Item = Listener>>(&mut self, listeners: I) {
        self.listeners.extend(listeners);
    }

    /// Add the listener methods `provider` declares.
    ///
    /// Returns the number of listeners added.
    pub fn add_provider<P: ListenerProvider>(&mut self, provider: &Arc<P>) -> usize {
        let listeners = MethodTable::<P>::of().listeners(provider);
        let added = listeners.len();
        self.listeners.extend(listeners);
        added
    }

    /// Forget `listener`. Does not touch any dispatcher.
    pub fn remove(&mut self, listener: &Listener) -> bool {
        match self.listeners.iter().position(|l| l == listener) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Register every listener of the group with `dispatcher`
    pub fn enable(&self, dispatcher: &EventDispatcher) -> usize {
        for listener in &self.listeners {
            dispatcher.register(listener.clone());
        }
        self.listeners.len()
    }

    /// Deregister every listener of the group from `dispatcher`.
    ///
    /// Returns how many were actually registered and got removed.
    pub fn disable(&self, dispatcher: &EventDispatcher) -> usize {
        self.listeners
            .iter()
            .filter(|listener| dispatcher.deregister(listener))
            .count()
    }
}
