//! Error types for the catalog library.

use thiserror::Error;

/// Main error type for catalog operations.
///
/// Every public operation runs inside one store transaction, so any of these
/// errors means the store was left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No document with the given key exists (or it is not visible to the
    /// requesting organization).
    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },

    /// The actor is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested lifecycle transition is not allowed from the current status.
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Malformed content supplied by the caller.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The underlying store failed or returned data that could not be decoded.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Optimistic concurrency check failed: the document changed since it was read.
    #[error("Revision conflict on '{id}': expected revision {expected}, found {actual}")]
    Conflict { id: String, expected: u64, actual: u64 },

    /// Error saving or loading a store snapshot.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the CSV library while importing a data table.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CatalogError {
    /// Shorthand for a [`CatalogError::NotFound`].
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        CatalogError::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Check if this error is an invalid lifecycle transition.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, CatalogError::InvalidStateTransition(_))
    }
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
