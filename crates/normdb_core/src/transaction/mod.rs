//! Atomic batch transactions.
//!
//! A batch runs a caller-supplied block against a staged copy of the
//! committed storage:
//! - **Atomicity**: the block's writes are published together or not at all
//! - **Isolation**: readers see either the state before or after a batch
//! - **Consistency**: indices never reference entities deleted by a batch

mod context;
mod manager;

pub use context::BatchContext;
pub use manager::{Commit, TransactionManager};
