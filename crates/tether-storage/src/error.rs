//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// The storage backend could not be opened or reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// A stored value could not be decoded.
    #[error("corrupt entry: {0}")]
    Corrupt(String),

    /// The namespace or key is invalid.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
