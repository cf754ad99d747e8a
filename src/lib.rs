//! # Slicestore
//!
//! A minimal merge-based state store with selector bindings.
//!
//! Slicestore is built from two layers:
//!
//! ## Store (state and subscriptions)
//!
//! - `Store` - Owns one record of state, replaced wholesale on every `merge`
//! - `Subscription` - Handle that unregisters its listener, idempotently
//! - `StoreHandle` - Non-owning reader/mutator for actions kept in the state
//!
//! ## Binding (derived slices)
//!
//! - `Selector` - Pure derivation from the full state to a slice
//! - `Binding` - Cached slice that re-derives on every notification and only
//!   reports a new slice when a shallow diff finds a real change
//!
//! State is made of [`Value`]s. Composite values are shared behind `Arc`s so
//! change detection can compare them by identity.

pub mod binding;
pub mod error;
pub mod store;
pub mod value;

// Re-export main types for convenience
pub use binding::{reconcile, Binding, Selector};
pub use error::{Result, StoreError};
pub use store::{ListenerId, ListenerPanicPolicy, Store, StoreConfig, StoreHandle, Subscription};
pub use value::{shallow_equal, Func, List, Record, Shape, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = Store::new(Record::from([("count", 0)]));
        let binding = Binding::new(&store, Selector::field("count"), |_| {});
        assert_eq!(binding.slice(), Value::from(0));
        store.merge([("count", 42)]).unwrap();
        assert_eq!(binding.slice(), Value::from(42));
    }
}
