//! Runtime driver error types.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors from the local container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime connection failed: {0}")]
    Connect(String),

    #[error("image pull failed for {image}: {reason}")]
    Pull { image: String, reason: String },

    #[error("container operation failed: {0}")]
    Container(String),

    #[error("no such container: {0}")]
    UnknownContainer(String),
}
