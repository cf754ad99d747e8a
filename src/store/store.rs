use super::config::{ListenerPanicPolicy, StoreConfig};
use super::listeners::{Listener, ListenerId, Listeners};
use crate::error::{Result, StoreError};
use crate::value::{Record, Value};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

pub(crate) struct StoreInner {
    state: RwLock<Record>,
    listeners: Listeners,
    config: StoreConfig,
}

/// A thread-safe store holding one record of state.
///
/// The state is never changed in place: every mutation builds a new record
/// and swaps it in, then synchronously notifies every subscribed listener
/// before returning. Cloning a `Store` yields another handle to the same
/// state and listeners.
///
/// # Examples
///
/// ```
/// use slicestore::{Record, Store};
///
/// let store = Store::new(Record::from([("count", 0)]));
/// store.merge([("count", 1)]).unwrap();
/// assert_eq!(store.get_state().get("count").and_then(|v| v.as_int()), Some(1));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store with the given initial state and default config.
    pub fn new(initial: Record) -> Self {
        Self::with_config(StoreConfig::default(), initial)
    }

    /// Create a store with the given initial state and config.
    pub fn with_config(config: StoreConfig, initial: Record) -> Self {
        tracing::debug!(store = %config.label, keys = initial.len(), "store created");
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(initial),
                listeners: Listeners::new(),
                config,
            }),
        }
    }

    /// Create a store from a builder.
    ///
    /// `builder` runs exactly once, synchronously, and receives a
    /// [`StoreHandle`] to the store being built: a state reader and merge
    /// mutator that actions stored in the state can capture without keeping
    /// the store alive. The state it sees while running is an empty record.
    /// It must return a record.
    ///
    /// # Examples
    ///
    /// ```
    /// use slicestore::{Func, Record, Store, Value};
    ///
    /// let store = Store::create(|api| {
    ///     let api = api.clone();
    ///     Value::from(Record::new().with("count", 0).with(
    ///         "inc",
    ///         Func::new(move |_| {
    ///             api.merge_with(|s| {
    ///                 let n = s.get("count").and_then(Value::as_int).unwrap_or(0);
    ///                 Record::from([("count", n + 1)])
    ///             })?;
    ///             Ok(Value::Null)
    ///         }),
    ///     ))
    /// })
    /// .unwrap();
    ///
    /// store.get_state().get("inc").unwrap().call(&[]).unwrap();
    /// assert_eq!(store.get_state().get("count"), Some(&Value::from(1)));
    /// ```
    pub fn create<F>(builder: F) -> Result<Self>
    where
        F: FnOnce(&StoreHandle) -> Value,
    {
        Self::create_with(StoreConfig::default(), builder)
    }

    /// Like [`create`](Self::create), with an explicit config.
    pub fn create_with<F>(config: StoreConfig, builder: F) -> Result<Self>
    where
        F: FnOnce(&StoreHandle) -> Value,
    {
        let store = Self::with_config(config, Record::new());
        match builder(&store.handle()) {
            Value::Record(initial) => {
                *store.inner.state.write() = initial;
                Ok(store)
            }
            other => {
                tracing::warn!(
                    store = %store.label(),
                    found = %other.shape(),
                    "store builder returned a non-record state"
                );
                Err(StoreError::InvalidInitialState {
                    found: other.shape(),
                })
            }
        }
    }

    /// The current state.
    pub fn get_state(&self) -> Record {
        self.inner.state.read().clone()
    }

    /// Read state without cloning the handle.
    ///
    /// `f` runs under the state's read lock and must not mutate the store.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Record) -> R,
    {
        f(&*self.inner.state.read())
    }

    /// Overlay `patch` onto the current state and notify listeners.
    pub fn merge(&self, patch: impl Into<Record>) -> Result<()> {
        let patch = patch.into();
        self.apply("merge", |current| current.merged(&patch))
    }

    /// Overlay a patch computed from the current state.
    ///
    /// `f` runs under the state's write lock: it sees exactly the state it
    /// patches and must not call back into the store.
    pub fn merge_with<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Record) -> Record,
    {
        self.apply("merge", |current| current.merged(&f(current)))
    }

    /// Swap in a whole new state and notify listeners.
    pub fn replace(&self, state: Record) -> Result<()> {
        self.apply("replace", move |_| state)
    }

    fn apply<F>(&self, op: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&Record) -> Record,
    {
        let (next, previous) = {
            let mut state = self.inner.state.write();
            let next = f(&*state);
            let previous = std::mem::replace(&mut *state, next.clone());
            (next, previous)
        };
        tracing::debug!(store = %self.label(), op, keys = next.len(), "state updated");
        self.notify(&next, &previous)
    }

    fn notify(&self, next: &Record, previous: &Record) -> Result<()> {
        let policy = self.inner.config.listener_panics;
        let mut notified = 0;
        let mut failures = Vec::new();

        for (id, listener) in self.inner.listeners.snapshot() {
            // Removed earlier in this pass.
            if !self.inner.listeners.contains(id) {
                continue;
            }
            notified += 1;
            match policy {
                ListenerPanicPolicy::Propagate => listener(next, previous),
                ListenerPanicPolicy::Isolate => {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(next, previous)))
                    {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(
                            store = %self.label(),
                            listener = %id,
                            %message,
                            "listener panicked"
                        );
                        failures.push(message);
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(StoreError::ListenerPanicked {
                failed: failures.len(),
                notified,
                message: failures.join("; "),
            })
        }
    }

    /// Register a listener called after every mutation with the new and the
    /// previous state.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    #[must_use = "dropping a Subscription unsubscribes its listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Record, &Record) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let id = self.inner.listeners.insert(listener);
        tracing::debug!(store = %self.label(), listener = %id, "listener subscribed");
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
            detached: false,
        }
    }

    /// Remove every listener. The state stays readable and writable.
    pub fn destroy(&self) {
        let removed = self.inner.listeners.clear();
        tracing::debug!(store = %self.label(), removed, "store destroyed");
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// The config this store was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The label attached to this store's log events.
    pub fn label(&self) -> &str {
        &self.inner.config.label
    }

    /// A non-owning handle to this store.
    pub fn handle(&self) -> StoreHandle {
        StoreHandle(Arc::downgrade(&self.inner))
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.label())
            .field("state", &self.get_state())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Non-owning store handle.
///
/// Callbacks that live inside a store (actions in its state, listeners it
/// notifies) hold one of these instead of a [`Store`], so the store can
/// still be dropped. Every operation fails with [`StoreError::Dropped`]
/// once it is.
#[derive(Clone)]
pub struct StoreHandle(Weak<StoreInner>);

impl StoreHandle {
    /// An owning handle, if the store is still alive.
    pub fn upgrade(&self) -> Option<Store> {
        self.0.upgrade().map(|inner| Store { inner })
    }

    fn store(&self) -> Result<Store> {
        self.upgrade().ok_or(StoreError::Dropped)
    }

    /// The current state of the store.
    pub fn get_state(&self) -> Result<Record> {
        Ok(self.store()?.get_state())
    }

    /// See [`Store::merge`].
    pub fn merge(&self, patch: impl Into<Record>) -> Result<()> {
        self.store()?.merge(patch)
    }

    /// See [`Store::merge_with`].
    pub fn merge_with<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Record) -> Record,
    {
        self.store()?.merge_with(f)
    }

    /// See [`Store::replace`].
    pub fn replace(&self, state: Record) -> Result<()> {
        self.store()?.replace(state)
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

/// Handle to one registered listener.
///
/// Dropping it unsubscribes; call [`detach`](Self::detach) to keep the
/// listener for the lifetime of the store instead.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: ListenerId,
    store: Weak<StoreInner>,
    detached: bool,
}

impl Subscription {
    /// Identity of the listener this handle controls.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener. Returns `true` only for the call that actually
    /// removed it; repeated calls are no-ops.
    pub fn unsubscribe(&self) -> bool {
        let Some(store) = self.store.upgrade() else {
            return false;
        };
        let removed = store.listeners.remove(self.id);
        if removed {
            tracing::debug!(store = %store.config.label, listener = %self.id, "listener unsubscribed");
        }
        removed
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.store
            .upgrade()
            .is_some_and(|store| store.listeners.contains(self.id))
    }

    /// Keep the listener registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.unsubscribe();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counter_store() -> Store {
        Store::new(Record::from([("count", 0)]).with("name", "test"))
    }

    fn count(store: &Store) -> Option<i64> {
        store.get_state().get("count").and_then(Value::as_int)
    }

    #[test]
    fn store_merge_overlays_patch() {
        let store = counter_store();
        let before = store.get_state();

        store.merge([("count", 42)]).unwrap();

        let after = store.get_state();
        assert_eq!(count(&store), Some(42));
        assert_eq!(after.get("name"), Some(&Value::from("test")));
        assert!(!after.same(&before));
        assert_eq!(before.get("count"), Some(&Value::from(0)));
    }

    #[test]
    fn store_merge_with_sees_current_state() {
        let store = counter_store();
        for _ in 0..3 {
            store
                .merge_with(|s| {
                    let n = s.get("count").and_then(Value::as_int).unwrap_or(0);
                    Record::from([("count", n + 10)])
                })
                .unwrap();
        }
        assert_eq!(count(&store), Some(30));
    }

    #[test]
    fn store_replace_drops_missing_keys() {
        let store = counter_store();
        store.replace(Record::from([("other", true)])).unwrap();
        let state = store.get_state();
        assert!(!state.contains_key("count"));
        assert_eq!(state.get("other"), Some(&Value::Bool(true)));
    }

    #[test]
    fn store_subscribe() {
        let store = counter_store();

        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let _sub = store.subscribe(move |_state, _prev| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        store.merge([("count", 1)]).unwrap();
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        store.merge([("count", 2)]).unwrap();
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listener_receives_new_and_previous_state() {
        let store = counter_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = store.subscribe(move |state, prev| {
            let get = |r: &Record| r.get("count").and_then(Value::as_int);
            seen_clone.lock().unwrap().push((get(state), get(prev)));
        });

        store.merge([("count", 5)]).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(Some(5), Some(0))]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let store = counter_store();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let sub = store.subscribe(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(!sub.is_active());

        store.merge([("count", 1)]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes_unless_detached() {
        let store = counter_store();
        drop(store.subscribe(|_, _| {}));
        assert_eq!(store.listener_count(), 0);

        store.subscribe(|_, _| {}).detach();
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn create_rejects_non_record_builders() {
        let err = Store::create(|_| Value::from(1)).unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidInitialState {
                found: crate::Shape::Scalar
            }
        );
    }

    #[test]
    fn create_runs_builder_once_with_empty_state() {
        let runs = AtomicUsize::new(0);
        let store = Store::create(|api| {
            runs.fetch_add(1, Ordering::SeqCst);
            assert!(api.get_state().unwrap().is_empty());
            Value::from(Record::from([("count", 7)]))
        })
        .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(count(&store), Some(7));
    }

    #[test]
    fn handle_fails_after_store_is_dropped() {
        let store = counter_store();
        let handle = store.handle();
        handle.merge([("count", 9)]).unwrap();
        assert_eq!(count(&store), Some(9));

        drop(store);
        assert!(handle.upgrade().is_none());
        assert_eq!(handle.merge([("count", 1)]), Err(StoreError::Dropped));
    }

    #[test]
    fn destroy_clears_listeners_but_keeps_state() {
        let store = counter_store();
        store.subscribe(|_, _| {}).detach();
        store.subscribe(|_, _| {}).detach();
        store.destroy();
        assert_eq!(store.listener_count(), 0);
        store.merge([("count", 3)]).unwrap();
        assert_eq!(count(&store), Some(3));
    }

    #[test]
    fn propagate_policy_unwinds_out_of_merge() {
        let store = Store::with_config(
            StoreConfig::new("strict").listener_panics(ListenerPanicPolicy::Propagate),
            Record::from([("count", 0)]),
        );
        let _sub = store.subscribe(|_, _| panic!("boom"));

        let result = catch_unwind(AssertUnwindSafe(|| store.merge([("count", 1)])));
        assert!(result.is_err());
        // The state swap happened before notification.
        assert_eq!(count(&store), Some(1));
    }

    #[test]
    fn panic_message_handles_both_payload_kinds() {
        let static_str: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(3_u8);
        assert_eq!(panic_message(static_str.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
