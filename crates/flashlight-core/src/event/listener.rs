use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::error::ListenerResult;
use crate::event::types::TypeKey;
use crate::event::{Event, Priority};

type InvokeFn = dyn Fn(&dyn Any) -> ListenerResult + Send + Sync;
type FilterFn = dyn Fn(&dyn Any) -> bool + Send + Sync;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// What two listener records are compared by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ListenerIdentity {
    /// A record built from closures; clones share the id.
    Instance(u64),
    /// A record wrapping a shared [`EventListener`] object.
    Handler { address: usize, target: TypeKey },
    /// A record produced from a provider's method table.
    Method {
        provider: usize,
        method: &'static str,
        handler: usize,
        target: TypeKey,
    },
}

struct ListenerInner {
    identity: ListenerIdentity,
    target: TypeKey,
    priority: Priority,
    subtype_filter: Option<TypeKey>,
    label: Cow<'static, str>,
    filter: Option<Box<FilterFn>>,
    invoke: Box<InvokeFn>,
}

/// Listener interface for handler objects.
///
/// Implement this on a type and wrap it with [`Listener::from_handler`] when
/// the handler carries its own state (a module, a counter, a back reference
/// to the dispatcher).
pub trait EventListener<E: Event>: Send + Sync {
    /// Executes the listener's code
    fn on_event(&self, event: &E) -> ListenerResult;

    fn priority(&self) -> Priority {
        Priority::NORMAL
    }

    /// Per-event filter; `false` skips this listener for the event
    fn accepts(&self, _event: &E) -> bool {
        true
    }

    /// Subtype tag this listener is restricted to, if any
    fn subtype_filter(&self) -> Option<TypeKey> {
        None
    }
}

/// An immutable listener record bound to one event type.
///
/// Cloning is cheap and clones compare equal, which is what
/// [`ListenerRegistry::deregister`](crate::event::ListenerRegistry::deregister)
/// matches on.
#[derive(Clone)]
pub struct Listener {
    inner: Arc<ListenerInner>,
}

impl Listener {
    /// Start building a closure listener for events of type `E`
    pub fn builder<E: Event>() -> ListenerBuilder<E> {
        ListenerBuilder::new()
    }

    /// Closure listener with the neutral priority and no filters
    pub fn new<E, F>(handler: F) -> Self
    where
        E: Event,
        F: Fn(&E) -> ListenerResult + Send + Sync + 'static,
    {
        Self::builder::<E>().build(handler)
    }

    /// Wrap a shared handler object.
    ///
    /// Records built from the same `Arc` are equal, so a handler can rebuild
    /// its own record to deregister itself.
    pub fn from_handler<E, H>(handler: Arc<H>) -> Self
    where
        E: Event,
        H: EventListener<E> + 'static,
    {
        let target = TypeKey::of::<E>();
        let identity = ListenerIdentity::Handler {
            address: Arc::as_ptr(&handler) as *const () as usize,
            target,
        };
        let priority = handler.priority();
        let subtype_filter = handler.subtype_filter();
        let filter_handler = Arc::clone(&handler);
        let filter: Box<FilterFn> = Box::new(move |event: &dyn Any| {
            event
                .downcast_ref::<E>()
                .is_some_and(|e| filter_handler.accepts(e))
        });
        let invoke: Box<InvokeFn> = Box::new(move |event: &dyn Any| match event.downcast_ref::<E>() {
            Some(e) => handler.on_event(e),
            None => Ok(()),
        });

        Self::from_parts(
            identity,
            target,
            priority,
            subtype_filter,
            Cow::Borrowed(std::any::type_name::<H>()),
            Some(filter),
            invoke,
        )
    }

    pub(crate) fn from_parts(
        identity: ListenerIdentity,
        target: TypeKey,
        priority: Priority,
        subtype_filter: Option<TypeKey>,
        label: Cow<'static, str>,
        filter: Option<Box<FilterFn>>,
        invoke: Box<InvokeFn>,
    ) -> Self {
        Self {
            inner: Arc::new(ListenerInner {
                identity,
                target,
                priority,
                subtype_filter,
                label,
                filter,
                invoke,
            }),
        }
    }

    /// The event type this listener is registered under
    pub fn target(&self) -> TypeKey {
        self.inner.target
    }

    pub fn priority(&self) -> Priority {
        self.inner.priority
    }

    pub fn subtype_filter(&self) -> Option<TypeKey> {
        self.inner.subtype_filter
    }

    /// Human readable name used in logs and errors
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Whether this listener wants `event`, given the event's subtype tag.
    pub(crate) fn accepts(&self, event: &dyn Any, subtype: Option<TypeKey>) -> bool {
        if let (Some(tag), Some(wanted)) = (subtype, self.inner.subtype_filter) {
            if tag != wanted {
                return false;
            }
        }
        match &self.inner.filter {
            Some(filter) => filter(event),
            None => true,
        }
    }

    pub(crate) fn invoke_dyn(&self, event: &dyn Any) -> ListenerResult {
        (self.inner.invoke)(event)
    }

    /// Invoke the listener directly, bypassing filters.
    ///
    /// Events of a type other than [`target`](Self::target) are ignored.
    pub fn invoke<E: Event>(&self, event: &E) -> ListenerResult {
        self.invoke_dyn(event)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.identity == other.inner.identity
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("label", &self.inner.label)
            .field("target", &self.inner.target)
            .field("priority", &self.inner.priority)
            .field("subtype_filter", &self.inner.subtype_filter)
            .finish_non_exhaustive()
    }
}

/// Builder for closure listeners
pub struct ListenerBuilder<E> {
    priority: Priority,
    filter: Option<Box<dyn Fn(&E) -> bool + Send + Sync>>,
    subtype_filter: Option<TypeKey>,
    label: Option<Cow<'static, str>>,
    _event: PhantomData<fn(&E)>,
}

impl<E: Event> ListenerBuilder<E> {
    fn new() -> Self {
        Self {
            priority: Priority::NORMAL,
            filter: None,
            subtype_filter: None,
            label: None,
            _event: PhantomData,
        }
    }

    pub fn priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Only invoke the listener for events matching `predicate`
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only invoke the listener for events tagged with subtype `S`
    pub fn subtype<S: ?Sized + 'static>(self) -> Self {
        self.subtype_key(TypeKey::of::<S>())
    }

    pub fn subtype_key(mut self, key: TypeKey) -> Self {
        self.subtype_filter = Some(key);
        self
    }

    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Finish the record with `handler` as its invocation
    pub fn build<F>(self, handler: F) -> Listener
    where
        F: Fn(&E) -> ListenerResult + Send + Sync + 'static,
    {
        let invoke: Box<InvokeFn> = Box::new(move |event: &dyn Any| match event.downcast_ref::<E>() {
            Some(e) => handler(e),
            None => Ok(()),
        });
        self.finish(invoke)
    }

    /// Finish the record as a canceler.
    ///
    /// A canceler leaves already canceled events alone and cancels the rest.
    /// Events without a cancellation flag are untouched.
    pub fn build_canceler(self) -> Listener {
        let invoke: Box<InvokeFn> = Box::new(|event: &dyn Any| {
            if let Some(cancellation) = event.downcast_ref::<E>().and_then(|e| e.cancellation()) {
                if !cancellation.is_canceled() {
                    cancellation.cancel();
                }
            }
            Ok(())
        });
        self.finish(invoke)
    }

    fn finish(self, invoke: Box<InvokeFn>) -> Listener {
        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        let label = self
            .label
            .unwrap_or_else(|| Cow::Owned(format!("listener#{}", id)));
        let filter = self.filter.map(|predicate| {
            Box::new(move |event: &dyn Any| event.downcast_ref::<E>().is_some_and(|e| predicate(e)))
                as Box<FilterFn>
        });

        Listener::from_parts(
            ListenerIdentity::Instance(id),
            TypeKey::of::<E>(),
            self.priority,
            self.subtype_filter,
            label,
            filter,
            invoke,
        )
    }
}
