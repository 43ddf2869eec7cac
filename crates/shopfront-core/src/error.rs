//! Shared error vocabulary for the repository contract.
//!
//! Propagation policy: primary-store errors always reach the caller
//! unchanged; secondary-store errors are absorbed into the migration error
//! log as [`StoreError::Replication`] and are only visible through the
//! operational surface.

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record does not exist in the store that was asked.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Malformed input (negative price, empty name, duplicate id, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A stock adjustment would drive the on-hand quantity below zero.
    #[error("insufficient stock for product {id}: {available} on hand, requested change {delta}")]
    InsufficientStock {
        id: String,
        available: i64,
        delta: i64,
    },

    /// An unrecognized migration phase value.
    #[error("invalid migration phase: {0:?}")]
    InvalidPhase(String),

    /// A secondary write or consistency check failed. Never surfaced on the
    /// normal data-access path.
    #[error("replication of {operation} failed: {message}")]
    Replication { operation: String, message: String },
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
