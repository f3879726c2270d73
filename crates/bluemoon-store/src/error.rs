//! Error types for Blue Moon storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// Every variant is an infrastructure failure: retrying the whole caller operation is safe.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// A lock guarding in-process state was poisoned by a panicking writer.
    pub(crate) fn poisoned<T>(_: std::sync::PoisonError<T>) -> Self {
        Self::Database("store lock poisoned".into())
    }
}
