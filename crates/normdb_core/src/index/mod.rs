//! Identity indices.
//!
//! Indices are auxiliary structures that track entity identities in an
//! application-defined order or grouping. They never hold entity values,
//! only identities, and are kept consistent with table deletions by the
//! batch transaction engine: every commit hands each index the set of
//! identities removed in that commit.
//!
//! # Index Types
//!
//! - [`OrderedIndex`]: identities in caller-defined order
//! - [`GroupedIndex`]: per-group ordered indices with empty-group pruning

mod grouped;
mod ordered;
mod traits;

pub use grouped::GroupedIndex;
pub use ordered::OrderedIndex;
pub use traits::{GroupedIndexDef, OrderedIndexDef};
