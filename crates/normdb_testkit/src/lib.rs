//! # NormDB Testkit
//!
//! Test utilities for NormDB.
//!
//! This crate provides:
//! - A sample `Library` schema and database helpers
//! - Property-based test generators using proptest
//! - Concurrency stress testing utilities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use normdb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_database() {
//!     with_library_db(|db| {
//!         let author = db.perform_batch_updates(|ctx| {
//!             Ok(ctx.insert_or_update(Author::new("Ursula")))
//!         });
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;

#[cfg(test)]
pub(crate) fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
