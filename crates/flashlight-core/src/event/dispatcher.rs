use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::config::{ConsistencyMode, DispatcherConfig};
use crate::event::error::{EventSystemError, Result};
use crate::event::latch::{CompletionLatch, WaitOutcome};
use crate::event::listener::Listener;
use crate::event::pool::{PendingInvocation, WorkerPool};
use crate::event::provider::{ListenerMethod, ListenerProvider, MethodTable};
use crate::event::registry::{ListenerRegistry, ListenerSequence};
use crate::event::types::TypeKey;
use crate::event::Event;

/// How [`EventDispatcher::post_with`] delivers an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Invoke listeners one after another on the calling thread, in
    /// priority order
    #[default]
    Synchronous,
    /// Submit every accepted listener to the worker pool and return once
    /// submitted. Priority order is not kept across workers.
    Asynchronous,
    /// Like [`Asynchronous`](Self::Asynchronous), but block until every
    /// submitted invocation has finished
    AsynchronousAwait,
}

/// Delivers events to the listeners registered for their type.
///
/// The dispatcher is internally synchronized: share it behind an `Arc` and
/// register, deregister and post from any thread.
pub struct EventDispatcher {
    registry: ListenerRegistry,
    pool: WorkerPool,
    serial: Option<ReentrantMutex<()>>,
    await_timeout: Option<Duration>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .field("serialized", &self.serial.is_some())
            .field("await_timeout", &self.await_timeout)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        let serial = match config.consistency {
            ConsistencyMode::Snapshot => None,
            ConsistencyMode::Serialized => Some(ReentrantMutex::new(())),
        };
        Self {
            registry: ListenerRegistry::new(),
            await_timeout: config.pool.await_timeout(),
            pool: WorkerPool::new(config.pool),
            serial,
        }
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Holds the global lock in serialized mode; a no-op otherwise.
    fn serialize(&self) -> Option<ReentrantMutexGuard<'_, ()>> {
        self.serial.as_ref().map(|lock| lock.lock())
    }

    /// Whether the calling thread is already inside a serialized operation
    fn holds_serial_lock(&self) -> bool {
        self.serial
            .as_ref()
            .is_some_and(|lock| lock.is_owned_by_current_thread())
    }

    /// Listeners currently registered for `key`, if there are any
    fn listeners_for(&self, key: TypeKey) -> Option<ListenerSequence> {
        self.registry.snapshot(key).filter(|s| !s.is_empty())
    }

    //--------------------------------------------------
    // Registration
    //--------------------------------------------------

    pub fn register(&self, listener: Listener) {
        let _serial = self.serialize();
        self.registry.register(listener);
    }

    /// Returns whether the listener was registered and is now removed
    pub fn deregister(&self, listener: &Listener) -> bool {
        let _serial = self.serialize();
        self.registry.deregister(listener)
    }

    /// Remove every listener registered for events of type `E`
    pub fn deregister_all<E: Event>(&self) -> usize {
        self.deregister_all_key(TypeKey::of::<E>())
    }

    pub fn deregister_all_key(&self, key: TypeKey) -> usize {
        let _serial = self.serialize();
        self.registry.deregister_all(key)
    }

    pub fn has_listeners<E: Event>(&self) -> bool {
        self.has_listeners_key(TypeKey::of::<E>())
    }

    pub fn has_listeners_key(&self, key: TypeKey) -> bool {
        self.registry.has_listeners(key)
    }

    /// See [`ListenerRegistry::for_each`]
    pub fn for_each<T, L>(&self, on_type: T, on_listener: L)
    where
        T: FnMut(TypeKey),
        L: FnMut(TypeKey, &Listener),
    {
        self.registry.for_each(on_type, on_listener);
    }

    /// Register one entry of a provider's method table.
    ///
    /// Returns `false` when the entry never bound an event handler.
    pub fn register_method<P: ListenerProvider>(&self, provider: &Arc<P>, method: &ListenerMethod<P>) -> bool {
        match method.bind(provider) {
            Some(listener) => {
                self.register(listener);
                true
            }
            None => {
                log::debug!(
                    "Skipping '{}' on {}: no event handler bound",
                    method.name(),
                    std::any::type_name::<P>()
                );
                false
            }
        }
    }

    /// Register every listener method `provider` declares.
    ///
    /// Returns the number of listeners registered.
    pub fn register_provider<P: ListenerProvider>(&self, provider: &Arc<P>) -> usize {
        let table = MethodTable::<P>::of();
        table
            .methods()
            .iter()
            .filter(|method| self.register_method(provider, method))
            .count()
    }

    pub fn register_providers<P: ListenerProvider>(&self, providers: &[Arc<P>]) -> usize {
        providers.iter().map(|p| self.register_provider(p)).sum()
    }

    /// Remove the listener a method table entry produced for `provider`
    pub fn deregister_method<P: ListenerProvider>(&self, provider: &Arc<P>, method: &ListenerMethod<P>) -> bool {
        method
            .bind(provider)
            .is_some_and(|listener| self.deregister(&listener))
    }

    /// Returns the number of listeners removed
    pub fn deregister_provider<P: ListenerProvider>(&self, provider: &Arc<P>) -> usize {
        let table = MethodTable::<P>::of();
        table
            .methods()
            .iter()
            .filter(|method| self.deregister_method(provider, method))
            .count()
    }

    pub fn deregister_providers<P: ListenerProvider>(&self, providers: &[Arc<P>]) -> usize {
        providers.iter().map(|p| self.deregister_provider(p)).sum()
    }

    //--------------------------------------------------
    // Dispatch
    //--------------------------------------------------

    /// Deliver `event` synchronously, highest priority first.
    ///
    /// Returns whether the event ended up canceled. The first listener error
    /// aborts the remaining listeners and is returned.
    pub fn post<E: Event>(&self, event: &E) -> Result<bool> {
        let _serial = self.serialize();
        let key = TypeKey::of::<E>();
        let Some(listeners) = self.listeners_for(key) else {
            return Ok(false);
        };
        log::trace!("Posting {} to {} listener(s)", key, listeners.len());

        let subtype = event.subtype();
        for listener in listeners.iter() {
            if !listener.accepts(event, subtype) {
                continue;
            }
            invoke(listener, event, key)?;
        }
        Ok(event.is_canceled())
    }

    /// Deliver `event` in the given mode.
    ///
    /// In [`DispatchMode::AsynchronousAwait`] a wait that times out, or that
    /// ends because some invocation was dropped unrun, yields `Ok(false)`:
    /// the cancellation flag cannot be trusted when not every listener ran.
    ///
    /// In serialized mode an awaited post from a thread that already holds
    /// the dispatch lock (a synchronous listener, say) fails with
    /// [`EventSystemError::NestedAwait`]: workers could not re-enter the
    /// dispatcher until the wait ended.
    pub fn post_with<E: Event>(&self, event: Arc<E>, mode: DispatchMode) -> Result<bool> {
        let await_completion = match mode {
            DispatchMode::Synchronous => return self.post(&*event),
            DispatchMode::Asynchronous => false,
            DispatchMode::AsynchronousAwait => true,
        };

        let key = TypeKey::of::<E>();
        if await_completion && self.holds_serial_lock() {
            return Err(EventSystemError::NestedAwait { event: key.name() });
        }

        let serial = self.serialize();
        let Some(listeners) = self.listeners_for(key) else {
            return Ok(false);
        };

        let subtype = event.subtype();
        let accepted: Vec<Listener> = listeners
            .iter()
            .filter(|listener| listener.accepts(&*event, subtype))
            .cloned()
            .collect();
        log::trace!(
            "Submitting {} to {} of {} listener(s)",
            key,
            accepted.len(),
            listeners.len()
        );

        let latch = await_completion.then(|| CompletionLatch::new(accepted.len()));
        let shared: Arc<dyn Any + Send + Sync> = event.clone();
        for listener in accepted {
            let ticket = latch.as_ref().map(|latch| latch.ticket());
            self.pool
                .submit(PendingInvocation::new(listener, Arc::clone(&shared), key.name(), ticket))?;
        }
        // Workers may need the lock to deregister themselves.
        drop(serial);

        if let Some(latch) = latch {
            let outcome = latch.wait(self.await_timeout);
            if outcome != WaitOutcome::Completed {
                log::warn!("Wait for listeners of {} ended early ({:?}); reporting not canceled", key, outcome);
                return Ok(false);
            }
        }
        Ok(event.is_canceled())
    }

    /// Deliver `event` synchronously, lowest priority first.
    #[deprecated(
        since = "0.1.0",
        note = "runs listeners in reverse priority order; only kept for callers migrating from bottom-up dispatch. Use `post`."
    )]
    pub fn post_reversed<E: Event>(&self, event: &E) -> Result<()> {
        let _serial = self.serialize();
        let key = TypeKey::of::<E>();
        let Some(listeners) = self.listeners_for(key) else {
            return Ok(());
        };

        let subtype = event.subtype();
        for listener in listeners.iter().rev() {
            if !listener.accepts(event, subtype) {
                continue;
            }
            invoke(listener, event, key)?;
        }
        Ok(())
    }

    //--------------------------------------------------
    // Worker pool lifecycle
    //--------------------------------------------------

    /// Start the worker pool now so the first asynchronous post does not pay
    /// for it. Returns the number of threads started.
    pub fn pre_start(&self) -> Result<usize> {
        self.pool.pre_start()
    }

    /// Stop the worker pool, returning invocations that never started.
    pub fn shut_down(&self) -> Vec<PendingInvocation> {
        self.pool.shut_down()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn invoke<E: Event>(listener: &Listener, event: &E, key: TypeKey) -> Result<()> {
    listener
        .invoke_dyn(event)
        .map_err(|source| EventSystemError::ListenerFailed {
            event: key.name(),
            listener: listener.label().to_owned(),
            source,
        })
}

/// Dispatcher shared between threads
pub type SharedEventDispatcher = Arc<EventDispatcher>;

/// Create a new shared dispatcher with the default configuration
pub fn create_dispatcher() -> SharedEventDispatcher {
    Arc::new(EventDispatcher::new())
}
