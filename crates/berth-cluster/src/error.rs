//! Peer client error types.

use thiserror::Error;

/// Result type alias for peer operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors from calls to peer hosts.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The peer was unreachable or timed out.
    #[error("peer unreachable: {0}")]
    Transport(String),

    /// The peer answered with a non-success status.
    #[error("peer returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The peer's response body did not decode.
    #[error("peer response decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClusterError {
    fn from(e: reqwest::Error) -> Self {
        ClusterError::Transport(e.to_string())
    }
}
