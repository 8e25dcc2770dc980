//! Host membership endpoints.
//!
//! Registration probes the candidate's `/host_info` first, so only a
//! reachable host enters the registry, and the stored snapshot is what
//! the host reported at that moment. Placement never trusts the
//! snapshot; it re-probes live.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use berth_state::HostRecord;

use crate::error::ApiError;
use crate::AppState;

/// Body of `/host_add` and `/host_remove`.
#[derive(Debug, Deserialize)]
pub struct HostRequest {
    pub name: String,
    pub port: u16,
}

/// POST /host_add
pub async fn add(
    State(state): State<AppState>,
    Json(req): Json<HostRequest>,
) -> Result<&'static str, ApiError> {
    if req.name.is_empty() {
        return Err(ApiError::Invalid("host add requires a name".to_string()));
    }
    debug!(name = %req.name, port = req.port, "host add");

    let probed = state
        .peers
        .host_info(&format!("{}:{}", req.name, req.port))
        .await
        .map_err(|e| ApiError::Unavailable(format!("host probe: {e}")))?;

    let record = HostRecord {
        name: req.name,
        port: req.port,
        disk: probed.disk,
        memory: probed.memory,
        cores: probed.cores,
    };
    state.store.create_host(&record).await?;
    info!(name = %record.name, port = record.port, "host registered");
    Ok("OK")
}

/// POST /host_remove
pub async fn remove(
    State(state): State<AppState>,
    Json(req): Json<HostRequest>,
) -> Result<&'static str, ApiError> {
    state.store.delete_host(&req.name, req.port).await?;
    info!(name = %req.name, port = req.port, "host deregistered");
    Ok("OK")
}

/// GET /host_list
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<HostRecord>>, ApiError> {
    Ok(Json(state.store.list_hosts().await?))
}

/// GET /host_info
pub async fn info(State(state): State<AppState>) -> Json<HostRecord> {
    let snapshot = state.probe.snapshot();
    Json(HostRecord {
        name: state.local_host.clone(),
        port: state.listen_port,
        disk: snapshot.disk,
        memory: snapshot.memory,
        cores: snapshot.cores,
    })
}
