use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stable token identifying a Rust type in the registry.
///
/// Equality and hashing only look at the [`TypeId`]; the name is kept for
/// logging and introspection.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Token for the type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Underlying type id
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Cancellation flag owned by an event.
///
/// The flag is atomic so listeners running on different workers may set it
/// concurrently.
#[derive(Debug, Default)]
pub struct Cancellation {
    canceled: AtomicBool,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cancellation status
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Marks the event as canceled
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }
}

/// A cancellation flag that can also be taken back.
#[derive(Debug, Default)]
pub struct PersistentCancellation {
    inner: Cancellation,
}

impl PersistentCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the cancellation status to `false`
    pub fn rescind(&self) {
        self.inner.canceled.store(false, Ordering::Release);
    }
}

impl Deref for PersistentCancellation {
    type Target = Cancellation;

    fn deref(&self) -> &Cancellation {
        &self.inner
    }
}

/// Phase marker for events fired around an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Fired before the action happens
    Pre,
    /// Fired after the action happened
    Post,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Pre => f.write_str("Pre"),
            Stage::Post => f.write_str("Post"),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct TestEvent {
    cancellation: Cancellation,
    subtype: Option<TypeKey>,
}

#[cfg(test)]
impl TestEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subtype<S: ?Sized + 'static>() -> Self {
        Self {
            cancellation: Cancellation::new(),
            subtype: Some(TypeKey::of::<S>()),
        }
    }
}

#[cfg(test)]
impl crate::event::Event for TestEvent {
    fn cancellation(&self) -> Option<&Cancellation> {
        Some(&self.cancellation)
    }

    fn subtype(&self) -> Option<TypeKey> {
        self.subtype
    }
}
