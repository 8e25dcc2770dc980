//! HTTP error mapping.
//!
//! Every failure surfaced to a client is one of six kinds; responses
//! carry the kind's status code and a human-readable text body, and are
//! logged on the node that answered.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use berth_cluster::ClusterError;
use berth_runtime::RuntimeError;
use berth_state::StateError;
use berth_storage::StorageError;

/// Error kinds surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ResourceExhausted(_) => StatusCode::INSUFFICIENT_STORAGE,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!(%status, "{self}");
        (status, self.to_string()).into_response()
    }
}

impl From<StateError> for ApiError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::NotFound(k) => ApiError::NotFound(k),
            StateError::Conflict(k) => ApiError::Conflict(k),
            StateError::Unavailable(m) => ApiError::Unavailable(m),
            StateError::Serialize(m) | StateError::Deserialize(m) => ApiError::Internal(m),
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(e: RuntimeError) -> Self {
        // Runtime failures are this node's problem, not the client's.
        ApiError::Internal(e.to_string())
    }
}

impl From<ClusterError> for ApiError {
    fn from(e: ClusterError) -> Self {
        match e {
            ClusterError::Transport(m) => ApiError::Unavailable(m),
            // Keep the peer's error kind when proxying on its behalf.
            ClusterError::Status { status, body } => match status.as_u16() {
                404 => ApiError::NotFound(body),
                409 => ApiError::Conflict(body),
                507 => ApiError::ResourceExhausted(body),
                503 => ApiError::Unavailable(body),
                400 => ApiError::Invalid(body),
                _ => ApiError::Internal(body),
            },
            ClusterError::Decode(m) => ApiError::Internal(m),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Conflict(name) => ApiError::Conflict(name),
            StorageError::NoCapacity { name, size } => {
                ApiError::ResourceExhausted(format!("{name} ({size} bytes)"))
            }
            StorageError::InvalidName(name) => ApiError::Invalid(name),
            StorageError::State(e) => e.into(),
            StorageError::Peer(e) => e.into(),
            StorageError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ApiError::NotFound(e.to_string())
            }
            StorageError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}
