use crate::value::Shape;
use thiserror::Error;

/// Errors surfaced by stores, bindings and state actions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The builder handed to [`Store::create`](crate::Store::create) produced
    /// something other than a record.
    #[error("initial state must be a record, builder returned a {found}")]
    InvalidInitialState { found: Shape },

    /// One or more listeners panicked while a merge was notifying subscribers.
    ///
    /// Every other listener of that pass still ran; the new state is in place.
    #[error("{failed} of {notified} listeners panicked during notification: {message}")]
    ListenerPanicked {
        failed: usize,
        notified: usize,
        message: String,
    },

    #[error("value is not callable: found a {found}")]
    NotCallable { found: Shape },

    /// The store behind a [`StoreHandle`](crate::StoreHandle) is gone.
    #[error("store has been dropped")]
    Dropped,

    /// Failure reported by a user action stored in the state.
    #[error("action failed: {0}")]
    Action(String),
}

/// Result alias used across the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
