//! Shallow-diff change detection for selected slices.

use crate::value::{Record, Value};

/// Fold a freshly selected `candidate` into the `previous` slice.
///
/// When both are records, the result starts as `previous` and takes a
/// private copy on the first key whose value is not [`Value::same`] as
/// before; later changes go into that same copy. Keys of the candidate that
/// are new are added, keys missing from it are removed. With no changes the
/// result *is* `previous` (same identity), so callers detect a change with
/// `!result.same(previous)`.
///
/// Any other combination of shapes returns `candidate` untouched, leaving
/// change detection to plain [`Value::same`].
pub fn reconcile(previous: &Value, candidate: Value) -> Value {
    match (previous, candidate) {
        (Value::Record(previous), Value::Record(candidate)) => {
            Value::Record(reconcile_records(previous, &candidate))
        }
        (_, candidate) => candidate,
    }
}

fn reconcile_records(previous: &Record, candidate: &Record) -> Record {
    // Shares `previous` until the first write, which copies it.
    let mut next = previous.clone();

    for (key, value) in candidate.iter() {
        let unchanged = previous.get(key).is_some_and(|old| old.same(value));
        if !unchanged {
            next.insert(key, value.clone());
        }
    }

    let removed: Vec<&str> = previous
        .keys()
        .filter(|key| !candidate.contains_key(key))
        .collect();
    for key in removed {
        next.remove(key);
    }

    next
}
