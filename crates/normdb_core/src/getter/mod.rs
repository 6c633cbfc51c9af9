//! Memoized getters.
//!
//! A [`Getter`] derives a value from a host state and only recomputes it
//! when its [`EqualityComputer`] reports that the input changed. Getters
//! built by a [`Database`](crate::Database) use two tiers:
//!
//! 1. storage timestamps: unchanged timestamps never recompute;
//! 2. an optional structural comparison, consulted only when the
//!    timestamps moved.
//!
//! Per-identity getters are shared through a bounded side-cache owned by
//! the database, so repeated requests for one identity return one getter.

mod cache;
mod embedding;
mod equality;
mod handle;
mod retained;

pub(crate) use cache::{GetterCache, GetterKind};
pub use embedding::DatabaseEmbedding;
pub use equality::EqualityComputer;
pub use handle::Getter;
pub use retained::RetainedValue;
