//! Error types for normdb core.

use crate::entity::Entity;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in normdb core operations.
///
/// Nothing in the core is fatal: the worst outcome of any error is a batch
/// transaction that had no effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A strict update targeted an identity absent from its table.
    #[error("entity not found: {id} in table {table}")]
    EntityNotFound {
        /// Name of the table that was searched.
        table: &'static str,
        /// Debug rendering of the missing identity.
        id: String,
    },

    /// The mutation block of a batch transaction aborted it.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for abort.
        reason: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an entity not found error for a table of `E`.
    pub fn entity_not_found<E: Entity>(id: &E::Id) -> Self {
        Self::EntityNotFound {
            table: E::table_name(),
            id: format!("{id:?}"),
        }
    }

    /// Creates a transaction aborted error.
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if this is an [`CoreError::EntityNotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound { .. })
    }
}
