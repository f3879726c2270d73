//! Error types for engine operations.

use bluemoon_core::{IdError, ValidationError};
use bluemoon_store::StoreError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by engine operations.
///
/// Engine components never retry; each failure is reported exactly once to the caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Input rejected before anything was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The addressed record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The record exists but is not in a state that accepts the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The key-value store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl EngineError {
    /// Shorthand for a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<IdError> for EngineError {
    fn from(err: IdError) -> Self {
        Self::Validation(err.to_string())
    }
}
