//! # NormDB Core
//!
//! Normalized in-memory entity store for application state.
//!
//! This crate provides:
//! - Entity tables keyed by a stable identity
//! - Ordered and grouped indices of entity references
//! - Atomic batch transactions with change-sets and index cleanup
//! - Memoized getters over any host state embedding the storage
//!
//! # Quick start
//!
//! ```rust,ignore
//! use normdb_core::{BackingStorage, Database};
//!
//! let db = Database::<Library>::new();
//! let author = db.perform_batch_updates(|ctx| {
//!     Ok(ctx.insert_or_update(Author::new("Ursula")))
//! })?;
//!
//! let getter = db.entity_getter::<Author, BackingStorage<Library>>(author.id);
//! assert!(getter.get(&db.snapshot()).is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod database;
mod entity;
mod error;
mod getter;
mod index;
mod schema;
mod stats;
mod storage;
mod transaction;
mod types;

pub use config::Config;
pub use database::Database;
pub use entity::{Entity, EntityId, EntityKey, EntityTable, InsertionResult};
pub use error::{CoreError, CoreResult};
pub use getter::{DatabaseEmbedding, EqualityComputer, Getter, RetainedValue};
pub use index::{GroupedIndex, GroupedIndexDef, OrderedIndex, OrderedIndexDef};
pub use schema::{Schema, SchemaDecl, StoredIn};
pub use stats::{DatabaseStats, StatsSnapshot};
pub use storage::{BackingStorage, ChangeSet, RemovalSet, TableChange};
pub use transaction::{BatchContext, Commit, TransactionManager};
pub use types::{Timestamp, TransactionId};
