//! Storage endpoints.
//!
//! Thin wrappers over [`berth_storage::StorageService`]; the routing and
//! spill-over logic lives there.

use axum::extract::{Path, State};
use axum::Json;
use bytes::Bytes;
use tracing::debug;

use berth_state::FileRecord;

use crate::error::ApiError;
use crate::AppState;

/// POST /storage_upload/{name}
pub async fn upload(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<(), ApiError> {
    debug!(%name, size = body.len(), "storage upload");
    state.storage.upload(&name, body).await?;
    Ok(())
}

/// GET /storage_download/{name}
pub async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Bytes, ApiError> {
    debug!(%name, "storage download");
    Ok(state.storage.download(&name).await?)
}

/// GET /storage_remove/{name}
pub async fn remove(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<&'static str, ApiError> {
    debug!(%name, "storage remove");
    state.storage.remove(&name).await?;
    Ok("OK")
}

/// GET /storage_list
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<FileRecord>>, ApiError> {
    Ok(Json(state.storage.list().await?))
}

/// GET /storage_file_size/{name}
pub async fn file_size(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<String, ApiError> {
    let size = state.storage.file_size(&name).await?;
    Ok(size.to_string())
}
