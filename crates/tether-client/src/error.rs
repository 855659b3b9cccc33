//! Client error types.

use thiserror::Error;

/// Errors returned by [`ComponentClient`](crate::ComponentClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The host could not be reached, or the handshake failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No live cache entry exists for the key.
    #[error("Cache miss: {key}")]
    CacheMiss {
        /// The key that was looked up.
        key: String,
    },

    /// A call failed after the connection was established.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ClientError {
    /// Whether this is a cache miss rather than a failure.
    #[must_use]
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::CacheMiss { .. })
    }

    /// Whether the host was never reachable.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
