//! Error types for the berth state layer.

use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur against the cluster metadata store.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("key already exists: {0}")]
    Conflict(String),

    #[error("kv unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}
