pub mod container;
pub mod dispatcher;
pub mod error;
pub mod latch;
pub mod listener;
pub mod pool;
pub mod provider;
pub mod registry;
pub mod types;

use std::any::Any;
use std::fmt;

/// Listener priority on a fixed signed 8-bit scale.
///
/// Values only establish relative order: higher priorities run earlier in
/// synchronous dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i8);

impl Priority {
    pub const HIGHEST: Priority = Priority(127);
    pub const HIGHER: Priority = Priority(25);
    pub const HIGH: Priority = Priority(10);
    pub const NORMAL: Priority = Priority(0);
    pub const LOW: Priority = Priority(-10);
    pub const LOWER: Priority = Priority(-25);
    pub const LOWEST: Priority = Priority(-128);

    /// Raw priority value
    pub fn value(self) -> i8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

impl From<i8> for Priority {
    fn from(value: i8) -> Self {
        Priority(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Core event trait.
///
/// The dispatcher keys listeners by the concrete type of the event. The two
/// methods are optional capabilities; the defaults declare that the event is
/// neither cancelable nor tagged with a subtype.
pub trait Event: Any + Send + Sync {
    /// Cancellation flag carried by this event, if it is cancelable
    fn cancellation(&self) -> Option<&types::Cancellation> {
        None
    }

    /// Secondary subtype tag used by listener subtype filters
    fn subtype(&self) -> Option<types::TypeKey> {
        None
    }

    /// Whether the event is currently canceled
    fn is_canceled(&self) -> bool {
        self.cancellation().is_some_and(|c| c.is_canceled())
    }
}

/// Re-export important types
pub use container::ListenerGroup;
pub use dispatcher::{DispatchMode, EventDispatcher, SharedEventDispatcher, create_dispatcher};
pub use error::{EventSystemError, ListenerError, ListenerResult};
pub use listener::{EventListener, Listener, ListenerBuilder};
pub use pool::{PendingInvocation, WorkerPool};
pub use provider::{ListenerMethod, ListenerProvider, MethodTable};
pub use registry::ListenerRegistry;
pub use types::{Cancellation, PersistentCancellation, Stage, TypeKey};

// Test module declaration
#[cfg(test)]
mod tests;
