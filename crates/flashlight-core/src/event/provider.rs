//! Registration tables for listener providers.
//!
//! A provider is an object exposing several listener methods. Instead of
//! discovering those methods at runtime, the provider type declares them
//! once in a [`MethodTable`]; the dispatcher turns each entry into a
//! [`Listener`] bound to a concrete provider instance.
//!
//! ```ignore
//! impl ListenerProvider for Hud {
//!     fn listener_methods(table: &mut MethodTable<Self>) {
//!         table
//!             .add(ListenerMethod::new("on_render").priority(Priority::HIGH).handles(Hud::on_render))
//!             .add(ListenerMethod::new("on_tick").handles(Hud::on_tick));
//!     }
//! }
//! ```
use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::event::error::ListenerResult;
use crate::event::listener::{Listener, ListenerIdentity};
use crate::event::types::TypeKey;
use crate::event::{Event, Priority};

type MethodInvokeFn<P> = dyn Fn(&P, &dyn Any) -> ListenerResult + Send + Sync;

/// A type whose instances carry listener methods
pub trait ListenerProvider: Send + Sync + Sized + 'static {
    /// Declare the listener methods of this type
    fn listener_methods(table: &mut MethodTable<Self>);
}

struct MethodBinding<P> {
    target: TypeKey,
    /// Address of the bound `fn`, telling apart entries that share a name
    handler: usize,
    invoke: Arc<MethodInvokeFn<P>>,
}

/// One entry of a [`MethodTable`].
///
/// An entry only becomes a listener once [`handles`](Self::handles) binds it
/// to an event type; unbound entries are rejected at registration.
pub struct ListenerMethod<P> {
    name: &'static str,
    priority: Priority,
    subtype_filter: Option<TypeKey>,
    binding: Option<MethodBinding<P>>,
}

impl<P> fmt::Debug for ListenerMethod<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerMethod")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("subtype_filter", &self.subtype_filter)
            .field("target", &self.binding.as_ref().map(|b| b.target))
            .finish()
    }
}

impl<P: ListenerProvider> ListenerMethod<P> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            priority: Priority::NORMAL,
            subtype_filter: None,
            binding: None,
        }
    }

    pub fn priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Restrict the method to events tagged with subtype `S`
    pub fn subtype<S: ?Sized + 'static>(mut self) -> Self {
        self.subtype_filter = Some(TypeKey::of::<S>());
        self
    }

    /// Bind the method to events of type `E`
    pub fn handles<E: Event>(mut self, method: fn(&P, &E) -> ListenerResult) -> Self {
        let invoke: Arc<MethodInvokeFn<P>> =
            Arc::new(move |provider: &P, event: &dyn Any| match event.downcast_ref::<E>() {
                Some(e) => method(provider, e),
                None => Ok(()),
            });
        self.binding = Some(MethodBinding {
            target: TypeKey::of::<E>(),
            handler: method as usize,
            invoke,
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Event type the method handles, if bound
    pub fn target(&self) -> Option<TypeKey> {
        self.binding.as_ref().map(|b| b.target)
    }

    pub fn is_listener(&self) -> bool {
        self.binding.is_some()
    }

    /// Build the listener record for this method on `provider`.
    ///
    /// Records for the same provider instance, method name and bound `fn`
    /// compare equal, so binding again later yields a record that
    /// deregisters the first.
    pub(crate) fn bind(&self, provider: &Arc<P>) -> Option<Listener> {
        let binding = self.binding.as_ref()?;
        let identity = ListenerIdentity::Method {
            provider: Arc::as_ptr(provider) as *const () as usize,
            method: self.name,
            handler: binding.handler,
            target: binding.target,
        };
        let receiver = Arc::clone(provider);
        let invoke = Arc::clone(&binding.invoke);

        Some(Listener::from_parts(
            identity,
            binding.target,
            self.priority,
            self.subtype_filter,
            Cow::Owned(format!("{}::{}", type_name::<P>(), self.name)),
            None,
            Box::new(move |event: &dyn Any| invoke(&receiver, event)),
        ))
    }
}

/// The listener methods a [`ListenerProvider`] declares
pub struct MethodTable<P> {
    methods: Vec<ListenerMethod<P>>,
}

impl<P> fmt::Debug for MethodTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.methods.iter()).finish()
    }
}

impl<P: ListenerProvider> MethodTable<P> {
    /// Collect the table `P` declares
    pub fn of() -> Self {
        let mut table = Self { methods: Vec::new() };
        P::listener_methods(&mut table);
        table
    }

    pub fn add(&mut self, method: ListenerMethod<P>) -> &mut Self {
        self.methods.push(method);
        self
    }

    pub fn methods(&self) -> &[ListenerMethod<P>] {
        &self.methods
    }

    /// Listener records for every bound method, bound to `provider`
    pub fn listeners(&self, provider: &Arc<P>) -> Vec<Listener> {
        self.methods.iter().filter_map(|m| m.bind(provider)).collect()
    }
}
