//! Storage service error types.

use thiserror::Error;

use berth_cluster::ClusterError;
use berth_state::StateError;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from cluster file storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file already exists: {0}")]
    Conflict(String),

    /// Local disk full and no registered peer accepted the bytes.
    #[error("no host has {size} free bytes for {name}")]
    NoCapacity { name: String, size: u64 },

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("peer error: {0}")]
    Peer(#[from] ClusterError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
