//! The store core.
//!
//! A store owns a single record of state, replaces it wholesale on every
//! mutation and synchronously notifies its listeners.

mod config;
mod listeners;
mod store;

pub use config::{ListenerPanicPolicy, StoreConfig};
pub use listeners::ListenerId;
pub use store::{Store, StoreHandle, Subscription};
