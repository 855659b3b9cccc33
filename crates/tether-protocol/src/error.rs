//! Protocol error types.

/// Errors from parsing targets and decoding wire payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The host target string could not be parsed.
    #[error("invalid host target: {0}")]
    InvalidTarget(String),

    /// The host target does not point at a loopback address.
    #[error("host target is not a loopback address: {0}")]
    NonLoopback(String),

    /// A cache payload was not valid base64.
    #[error("invalid payload encoding: {0}")]
    Payload(String),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
