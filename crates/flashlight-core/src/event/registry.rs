use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::listener::Listener;
use crate::event::types::TypeKey;

/// Ordered listeners for one event type. Published sequences are never
/// mutated; writers replace them.
pub type ListenerSequence = Arc<Vec<Listener>>;

/// Per-event-type listener collections kept in descending priority order.
///
/// Sequences are copy-on-write: a dispatch holds the [`ListenerSequence`]
/// that existed when it started, so concurrent registration or
/// deregistration never disturbs a traversal in progress. The map lock is
/// only held long enough to swap a sequence.
#[derive(Default)]
pub struct ListenerRegistry {
    sequences: RwLock<HashMap<TypeKey, ListenerSequence>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sequences = self.sequences.read();
        let listener_count: usize = sequences.values().map(|s| s.len()).sum();
        f.debug_struct("ListenerRegistry")
            .field("event_types", &sequences.len())
            .field("listener_count", &listener_count)
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `listener` under its target type.
    ///
    /// The new record lands after every existing record whose priority is
    /// greater than or equal to its own, so equal priorities keep arrival
    /// order. Duplicates are not detected.
    pub fn register(&self, listener: Listener) {
        let target = listener.target();
        let mut sequences = self.sequences.write();
        let sequence = sequences.entry(target).or_default();

        let mut updated = Vec::with_capacity(sequence.len() + 1);
        updated.extend(sequence.iter().cloned());
        let index = updated.partition_point(|existing| existing.priority() >= listener.priority());
        log::debug!(
            "Registering listener '{}' for {} at position {} (priority {})",
            listener.label(),
            target,
            index,
            listener.priority()
        );
        updated.insert(index, listener);
        *sequence = Arc::new(updated);
    }

    /// Remove the first record equal to `listener`.
    ///
    /// Returns whether anything was removed. The remaining records keep their
    /// relative order.
    pub fn deregister(&self, listener: &Listener) -> bool {
        let target = listener.target();
        let mut sequences = self.sequences.write();
        let Some(sequence) = sequences.get_mut(&target) else {
            return false;
        };
        let Some(index) = sequence.iter().position(|existing| existing == listener) else {
            return false;
        };

        let mut updated = sequence.to_vec();
        updated.remove(index);
        *sequence = Arc::new(updated);
        log::debug!("Deregistered listener '{}' from {}", listener.label(), target);
        true
    }

    /// Drop every listener registered for `key` and forget the type.
    ///
    /// Returns the number of listeners removed.
    pub fn deregister_all(&self, key: TypeKey) -> usize {
        let removed = self
            .sequences
            .write()
            .remove(&key)
            .map(|sequence| sequence.len())
            .unwrap_or(0);
        if removed > 0 {
            log::debug!("Deregistered all {} listeners from {}", removed, key);
        }
        removed
    }

    /// Whether a non-empty sequence exists for exactly `key`
    pub fn has_listeners(&self, key: TypeKey) -> bool {
        self.sequences
            .read()
            .get(&key)
            .is_some_and(|sequence| !sequence.is_empty())
    }

    /// Number of listeners registered for `key`
    pub fn len(&self, key: TypeKey) -> usize {
        self.sequences.read().get(&key).map_or(0, |s| s.len())
    }

    /// Whether no listener is registered at all
    pub fn is_empty(&self) -> bool {
        self.sequences.read().values().all(|s| s.is_empty())
    }

    /// Every event type the registry has seen and not cleared
    pub fn event_types(&self) -> Vec<TypeKey> {
        self.sequences.read().keys().copied().collect()
    }

    /// The sequence for `key` as it exists right now
    pub fn snapshot(&self, key: TypeKey) -> Option<ListenerSequence> {
        self.sequences.read().get(&key).cloned()
    }

    /// Visit every known event type, then each of its listeners in priority
    /// order.
    ///
    /// The visit runs over a snapshot taken up front, so visitors may call
    /// back into the registry.
    pub fn for_each<T, L>(&self, mut on_type: T, mut on_listener: L)
    where
        T: FnMut(TypeKey),
        L: FnMut(TypeKey, &Listener),
    {
        let entries: Vec<(TypeKey, ListenerSequence)> = self
            .sequences
            .read()
            .iter()
            .map(|(key, sequence)| (*key, Arc::clone(sequence)))
            .collect();

        for (key, sequence) in entries {
            on_type(key);
            for listener in sequence.iter() {
                on_listener(key, listener);
            }
        }
    }
}
