//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Failure reported by a persistence collaborator.
///
/// Stores are external to the workflow engine; this is the narrow error
/// vocabulary they share with it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record with the same identity (or unique key) already exists.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// The record addressed by an update/delete does not exist.
    #[error("missing record: {0}")]
    Missing(String),

    /// The backing store could not serve the request (e.g. poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Domain-level error.
///
/// Every variant is raised synchronously and surfaced to the caller as-is;
/// nothing is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input failed validation (bad quantity, discount out of range, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is not allowed in the current status of the record.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// No unit price could be derived and no override was supplied.
    #[error("price resolution failed: {0}")]
    PriceResolution(String),

    /// A uniqueness or concurrency conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The persistence collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn price_resolution(msg: impl Into<String>) -> Self {
        Self::PriceResolution(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
