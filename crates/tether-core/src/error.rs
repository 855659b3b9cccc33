//! Core error types.

use thiserror::Error;

/// Errors from core identity and environment handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The component name is malformed.
    #[error("invalid component name: {0}")]
    InvalidName(String),

    /// A required environment variable is missing or malformed.
    #[error("environment error: {0}")]
    Environment(String),

    /// The home directory could not be resolved.
    #[error("home directory error: {0}")]
    Home(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
