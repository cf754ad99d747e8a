use super::diff::reconcile;
use super::selector::Selector;
use crate::store::{Store, Subscription};
use crate::value::Value;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

type OnChange = Arc<dyn Fn(&Value) + Send + Sync>;

/// What decides when the binding's listener is torn down and re-registered.
#[derive(Clone)]
enum Deps {
    /// Resubscribe when the selector identity changes.
    Selector(Selector),
    /// Resubscribe when any of these values changes.
    Explicit(Vec<Value>),
}

impl Deps {
    fn resolve(selector: &Selector, deps: Option<Vec<Value>>) -> Self {
        match deps {
            Some(values) => Deps::Explicit(values),
            None => Deps::Selector(selector.clone()),
        }
    }

    fn changed(&self, other: &Deps) -> bool {
        match (self, other) {
            (Deps::Selector(a), Deps::Selector(b)) => !a.same(b),
            (Deps::Explicit(a), Deps::Explicit(b)) => {
                a.len() != b.len() || a.iter().zip(b).any(|(x, y)| !x.same(y))
            }
            _ => true,
        }
    }
}

/// A cached, change-gated view of one slice of a store's state.
///
/// A binding stands between a store and one owner (a component instance,
/// a view, a test). On activation it selects its slice immediately and
/// registers a listener; every notification re-runs the selector against the
/// live state, shallow-diffs the result against the slice it last surfaced,
/// and calls `on_change` only when something actually changed.
///
/// The last surfaced slice lives in a shared cell that the listener reads on
/// every call, so comparisons never run against the value that was current
/// when the listener was registered.
///
/// # Examples
///
/// ```
/// use slicestore::{Binding, Record, Selector, Store, Value};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let store = Store::new(Record::from([("count", 0), ("other", 0)]));
/// let renders = Arc::new(AtomicUsize::new(0));
/// let renders_clone = renders.clone();
///
/// let binding = Binding::new(&store, Selector::pick(["count"]), move |_| {
///     renders_clone.fetch_add(1, Ordering::SeqCst);
/// });
///
/// store.merge([("other", 1)]).unwrap();
/// assert_eq!(renders.load(Ordering::SeqCst), 0);
///
/// store.merge([("count", 1)]).unwrap();
/// assert_eq!(renders.load(Ordering::SeqCst), 1);
/// assert_eq!(binding.slice(), Value::from(Record::from([("count", 1)])));
/// ```
pub struct Binding {
    store: Store,
    selector: Selector,
    deps: Deps,
    slice: Arc<RwLock<Value>>,
    on_change: OnChange,
    subscription: Option<Subscription>,
}

impl Binding {
    /// Bind `selector` to `store`, resubscribing whenever the selector
    /// identity changes on [`update`](Self::update).
    pub fn new<F>(store: &Store, selector: Selector, on_change: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self::build(store, selector, None, Arc::new(on_change))
    }

    /// Bind `selector` to `store`, resubscribing only when `deps` changes on
    /// [`update`](Self::update).
    pub fn with_deps<F>(store: &Store, selector: Selector, deps: Vec<Value>, on_change: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self::build(store, selector, Some(deps), Arc::new(on_change))
    }

    fn build(store: &Store, selector: Selector, deps: Option<Vec<Value>>, on_change: OnChange) -> Self {
        let deps = Deps::resolve(&selector, deps);
        let selected = selector.select(&store.get_state());
        let mut binding = Self {
            store: store.clone(),
            selector,
            deps,
            slice: Arc::new(RwLock::new(selected)),
            on_change,
            subscription: None,
        };
        binding.subscribe();
        binding
    }

    fn subscribe(&mut self) {
        let store = self.store.handle();
        let selector = self.selector.clone();
        let slice = Arc::clone(&self.slice);
        let on_change = Arc::clone(&self.on_change);

        let subscription = self.store.subscribe(move |_, _| {
            let Some(store) = store.upgrade() else {
                return;
            };
            let next = {
                // Select, compare and store under one lock so a slower
                // notification can't overwrite a newer slice.
                let mut cell = slice.write();
                // Always the live state: a nested or concurrent merge may
                // already have superseded the state this notification was
                // sent for.
                let candidate = selector.select(&store.get_state());
                let next = reconcile(&cell, candidate);
                if next.same(&cell) {
                    return;
                }
                *cell = next.clone();
                next
            };
            tracing::trace!(store = %store.label(), "binding surfaced a new slice");
            on_change(&next);
        });
        tracing::debug!(
            store = %self.store.label(),
            listener = %subscription.id(),
            "binding activated"
        );
        self.subscription = Some(subscription);
    }

    /// The slice most recently surfaced to the owner.
    pub fn slice(&self) -> Value {
        self.slice.read().clone()
    }

    /// The selector from the latest activation or update.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Whether the binding currently has a registered listener.
    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Host re-render: select again against the current state, and
    /// resubscribe if the dependencies changed (or the binding was
    /// deactivated).
    ///
    /// With `deps` set to `None` the dependency is the selector identity.
    /// With explicit deps that stay the same, the registered listener keeps
    /// the selector it was activated with: the slice holds the new
    /// selector's output until the next notification, which surfaces the
    /// old selector's output again.
    pub fn update(&mut self, selector: Selector, deps: Option<Vec<Value>>) {
        let deps = Deps::resolve(&selector, deps);
        let selected = selector.select(&self.store.get_state());
        *self.slice.write() = selected;
        self.selector = selector;

        if self.deps.changed(&deps) || !self.is_active() {
            self.deps = deps;
            self.deactivate();
            self.subscribe();
        }
    }

    /// Unregister the listener. Calling it again is a no-op.
    pub fn deactivate(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!(
                store = %self.store.label(),
                listener = %subscription.id(),
                "binding deactivated"
            );
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("store", &self.store.label())
            .field("selector", &self.selector)
            .field("slice", &self.slice())
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.deactivate();
    }
}
