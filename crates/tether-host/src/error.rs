//! Host error types.

use thiserror::Error;

/// Errors that can occur in the host.
#[derive(Debug, Error)]
pub enum HostError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The RPC endpoint could not be bound.
    #[error("Failed to bind RPC endpoint: {0}")]
    Bind(String),

    /// A component could not be started.
    #[error("Failed to launch component: {0}")]
    Launch(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] tether_storage::StorageError),

    /// Component lifecycle error.
    #[error(transparent)]
    Component(#[from] tether_components::ComponentError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
