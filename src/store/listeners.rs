use crate::value::Record;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of one registered listener within its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Listener callback: receives the new state and the state it replaced.
pub(crate) type Listener = Arc<dyn Fn(&Record, &Record) + Send + Sync>;

/// Ordered listener collection owned by a single store.
pub(crate) struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<IndexMap<ListenerId, Listener>>,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    pub(crate) fn insert(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.entries.lock().insert(id, listener);
        id
    }

    /// Returns `true` if `id` was registered.
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        self.entries.lock().shift_remove(&id).is_some()
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    /// Copy of the current registrations in insertion order. Notification
    /// iterates this copy so listeners can (un)register freely meanwhile.
    pub(crate) fn snapshot(&self) -> Vec<(ListenerId, Listener)> {
        self.entries
            .lock()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect()
    }

    pub(crate) fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        Arc::new(|_: &Record, _: &Record| {})
    }

    #[test]
    fn ids_are_unique_and_removal_is_by_id() {
        let listeners = Listeners::new();
        let a = listeners.insert(noop());
        let b = listeners.insert(noop());
        assert_ne!(a, b);

        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        assert!(!listeners.contains(a));
        assert!(listeners.contains(b));
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn snapshot_keeps_insertion_order() {
        let listeners = Listeners::new();
        let ids: Vec<_> = (0..4).map(|_| listeners.insert(noop())).collect();
        listeners.remove(ids[1]);

        let order: Vec<_> = listeners.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn clear_reports_removed_count() {
        let listeners = Listeners::new();
        listeners.insert(noop());
        listeners.insert(noop());
        assert_eq!(listeners.clear(), 2);
        assert_eq!(listeners.len(), 0);
    }
}
