//! Selector bindings.
//!
//! Bindings bridge a [`Store`](crate::Store) to one observer: they derive a
//! slice with a [`Selector`], keep the last surfaced slice in a shared cell
//! and only report a new slice when a shallow diff finds a real change.

mod binding;
mod diff;
mod selector;

pub use binding::Binding;
pub use diff::reconcile;
pub use selector::Selector;
