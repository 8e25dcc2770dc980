//! Read-only HTML dashboard.
//!
//! One page with the four cluster inventories, rendered from KV records.

use askama::Template;
use axum::extract::State;
use axum::response::Html;

use berth_state::{ContainerRecord, FileRecord, HostRecord, PodRecord};

use crate::error::ApiError;
use crate::AppState;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    local_host: String,
    files: Vec<FileRecord>,
    hosts: Vec<HostRecord>,
    pods: Vec<PodRecord>,
    containers: Vec<ContainerRecord>,
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let page = IndexTemplate {
        local_host: state.local_host.clone(),
        files: state.store.list_files().await?,
        hosts: state.store.list_hosts().await?,
        pods: state.store.list_pods().await?,
        containers: state.store.list_containers().await?,
    };
    page.render()
        .map(Html)
        .map_err(|e| ApiError::Internal(format!("template render: {e}")))
}
