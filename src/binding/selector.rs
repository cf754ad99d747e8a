use crate::value::{Record, Value};
use std::fmt;
use std::sync::Arc;

type SelectFn = dyn Fn(&Record) -> Value + Send + Sync;

/// A pure derivation from the full state to a slice of interest.
///
/// Selectors carry an identity: clones compare [`same`](Self::same), while
/// two separately constructed selectors never do, even if they compute the
/// same thing. Bindings resubscribe when the identity changes.
#[derive(Clone)]
pub struct Selector(Arc<SelectFn>);

impl Selector {
    /// Wrap a derivation function as a new selector identity.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Selects the whole state.
    pub fn identity() -> Self {
        Self::new(|state| Value::Record(state.clone()))
    }

    /// Selects one key, or `Null` when the key is absent.
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |state| state.get(&name).cloned().unwrap_or_default())
    }

    /// Builds a fresh record of the named keys on every call. Absent keys
    /// are skipped.
    pub fn pick<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        Self::new(move |state| {
            Value::Record(
                names
                    .iter()
                    .filter_map(|name| state.get(name).map(|v| (name.clone(), v.clone())))
                    .collect(),
            )
        })
    }

    /// Run the selector against `state`.
    pub fn select(&self, state: &Record) -> Value {
        (self.0)(state)
    }

    /// Identity comparison.
    pub fn same(&self, other: &Selector) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_identity_follows_clones() {
        let a = Selector::identity();
        let b = a.clone();
        assert!(a.same(&b));
        assert!(!a.same(&Selector::identity()));
    }

    #[test]
    fn field_defaults_to_null() {
        let state = Record::from([("count", 3)]);
        assert_eq!(Selector::field("count").select(&state), Value::from(3));
        assert!(Selector::field("missing").select(&state).is_null());
    }

    #[test]
    fn pick_builds_fresh_records() {
        let state = Record::from([("a", 1), ("b", 2), ("c", 3)]);
        let pick = Selector::pick(["a", "c", "zzz"]);

        let first = pick.select(&state);
        let second = pick.select(&state);
        assert_eq!(first, Value::from(Record::from([("a", 1), ("c", 3)])));
        assert_eq!(first, second);
        assert!(!first.same(&second));
    }
}
