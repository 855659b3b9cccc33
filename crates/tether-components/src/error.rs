//! Component lifecycle error types.

use std::path::PathBuf;

use tether_core::CoreError;

use crate::component::LifecycleState;

/// Errors from component lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// A lifecycle hook exited non-zero, failed to start, or timed out.
    #[error("{hook} hook failed{}: {message}", exit_suffix(.exit_code))]
    HookFailure {
        /// Hidden subcommand that was invoked.
        hook: String,
        /// Exit code, if the process ran to completion.
        exit_code: Option<i32>,
        /// Trimmed stderr of the hook, or a description of the failure.
        message: String,
    },

    /// The requested state change is not an edge of the lifecycle.
    #[error("component {name} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Component name.
        name: String,
        /// Current state.
        from: LifecycleState,
        /// Requested state.
        to: LifecycleState,
    },

    /// No component with this name is installed.
    #[error("component not found: {0}")]
    NotFound(String),

    /// A component with this name is already installed.
    #[error("component already installed: {0}")]
    AlreadyInstalled(String),

    /// Rollback was requested but no prior version is kept.
    #[error("no previous version of {0} to roll back to")]
    NoPreviousVersion(String),

    /// The artifact does not match the expected digest.
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Digest the caller expected.
        expected: String,
        /// Digest computed from the artifact.
        actual: String,
    },

    /// The component name is malformed.
    #[error("invalid component name: {0}")]
    InvalidName(String),

    /// A version string is not valid semver.
    #[error("invalid version '{version}': {message}")]
    InvalidVersion {
        /// The offending text.
        version: String,
        /// Parse error.
        message: String,
    },

    /// Lock file read/write/parse error.
    #[error("lockfile error at {path}: {message}")]
    LockfileError {
        /// Path to the lock file.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for ComponentError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidName(msg) => Self::InvalidName(msg),
            other => Self::Io(std::io::Error::other(other.to_string())),
        }
    }
}

impl ComponentError {
    /// Whether this is a hook failure.
    #[must_use]
    pub fn is_hook_failure(&self) -> bool {
        matches!(self, Self::HookFailure { .. })
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (exit code {c})")).unwrap_or_default()
}

/// Result type for component operations.
pub type ComponentResult<T> = Result<T, ComponentError>;
