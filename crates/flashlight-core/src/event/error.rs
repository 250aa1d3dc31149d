//! # Flashlight Event System Errors
//!
//! Defines error types specific to the event system.
//!
//! [`EventSystemError`] covers failures surfaced by the dispatcher: a
//! listener failing during synchronous dispatch, the worker pool failing to
//! start, asynchronous work submitted after the pool was shut down, or an
//! awaited post that would deadlock on the serialized dispatch lock.
//! Registration rejections are not errors; they are reported as `false`.
use thiserror::Error;

/// Error type returned by listener handlers
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by listener handlers
pub type ListenerResult = std::result::Result<(), ListenerError>;

#[derive(Debug, Error)]
pub enum EventSystemError {
    #[error("Listener '{listener}' failed while handling event '{event}': {source}")]
    ListenerFailed {
        event: &'static str,
        listener: String,
        #[source]
        source: ListenerError,
    },

    #[error("Failed to start the dispatcher worker pool: {source}")]
    PoolStartFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("The dispatcher worker pool has been shut down")]
    PoolShutDown,

    #[error("Cannot await listeners of '{event}' while this thread holds the serialized dispatch lock")]
    NestedAwait { event: &'static str },
}

pub type Result<T> = std::result::Result<T, EventSystemError>;
