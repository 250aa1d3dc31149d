//! # Flashlight Core
//!
//! An in-process, typed event dispatcher. Listeners are registered per event
//! type with a priority; posting an event runs every matching listener,
//! either on the calling thread in priority order or across a worker pool.
pub mod config;
pub mod event;

// Re-export key public types for easier use by embedding applications
pub use config::{ConsistencyMode, DispatcherConfig, WorkerPoolConfig};
pub use event::{
    Cancellation, DispatchMode, Event, EventDispatcher, EventListener, EventSystemError, Listener,
    ListenerGroup, ListenerMethod, ListenerProvider, MethodTable, PersistentCancellation, Priority,
    TypeKey,
};

#[cfg(test)]
mod tests;
