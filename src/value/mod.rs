//! The state data model.
//!
//! Every piece of state handled by a store is a [`Value`]. Composite values
//! (lists, records and functions) live behind an `Arc`, so cloning shares the
//! allocation and [`Value::same`] can answer "is this the same object" the
//! way change detection needs it to.

mod json;
mod record;
mod value;

pub use record::Record;
pub use value::{shallow_equal, Func, List, Shape, Value};
