//! Entity types and storage.

mod id;
mod table;
mod traits;

pub use id::EntityId;
pub(crate) use table::TableDiff;
pub use table::{EntityTable, InsertionResult};
pub use traits::{Entity, EntityKey};
