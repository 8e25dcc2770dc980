//! Pod endpoints.
//!
//! `pod_add` only records desired state; the reconciler brings replicas
//! up on its next tick. `pod_remove` tears down every claimed replica
//! best-effort before deleting the spec, so a failed host cannot block
//! the pod's removal.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info, warn};

use berth_state::{ContainerRecord, PodRecord, StateError};

use crate::error::ApiError;
use crate::AppState;

/// Body of `/pod_remove`.
#[derive(Debug, Deserialize)]
pub struct PodRemoveRequest {
    pub name: String,
}

/// POST /pod_add
pub async fn add(
    State(state): State<AppState>,
    Json(pod): Json<PodRecord>,
) -> Result<(), ApiError> {
    if pod.name.is_empty() || pod.image.is_empty() {
        return Err(ApiError::Invalid("pod requires name and image".to_string()));
    }
    if pod.count == 0 {
        return Err(ApiError::Invalid("pod count must be positive".to_string()));
    }
    debug!(name = %pod.name, count = pod.count, "pod add");

    state.store.create_pod(&pod).await?;
    info!(name = %pod.name, image = %pod.image, count = pod.count, "pod accepted");
    Ok(())
}

/// POST /pod_remove
pub async fn remove(
    State(state): State<AppState>,
    Json(req): Json<PodRemoveRequest>,
) -> Result<String, ApiError> {
    debug!(name = %req.name, "pod remove");
    let prefix = format!("{}-", req.name);

    for record in state.store.list_containers_with_prefix(&prefix).await? {
        if record.replica_index(&req.name).is_none() {
            continue;
        }
        teardown_replica(&state, &record).await;
    }

    state.store.delete_pod(&req.name).await?;
    info!(name = %req.name, "pod removed");
    Ok(req.name)
}

/// GET /pod_list
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PodRecord>>, ApiError> {
    Ok(Json(state.store.list_pods().await?))
}

/// Stop and remove one replica on its owning host, then drop its record.
/// Every step is best-effort; a dead host must not wedge pod removal.
async fn teardown_replica(state: &AppState, record: &ContainerRecord) {
    if record.host == state.local_host {
        if let Err(e) = state.runtime.stop(&record.id).await {
            warn!(name = %record.name, error = %e, "replica stop failed");
        }
        if let Err(e) = state.runtime.remove(&record.id).await {
            warn!(name = %record.name, error = %e, "replica remove failed");
        }
    } else {
        let addr = state.peer_addr(&record.host).await;
        if let Err(e) = state.peers.stop_container(&addr, record).await {
            warn!(name = %record.name, host = %record.host, error = %e, "replica stop failed");
        }
        if let Err(e) = state.peers.remove_container(&addr, record).await {
            warn!(name = %record.name, host = %record.host, error = %e, "replica remove failed");
        }
    }

    match state.store.delete_container(&record.name).await {
        Ok(()) => {}
        // The owner already deleted it while handling our forward.
        Err(StateError::NotFound(_)) => {}
        Err(e) => warn!(name = %record.name, error = %e, "replica record delete failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers;
    use crate::testutil::test_node;
    use berth_runtime::ContainerRuntime;

    fn pod(name: &str, count: u64) -> PodRecord {
        PodRecord {
            name: name.to_string(),
            image: "nginx".to_string(),
            count,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn add_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_node(dir.path(), "h1");

        add(State(state.clone()), Json(pod("web", 3))).await.unwrap();

        let Json(pods) = list(State(state)).await.unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].name, "web");
        assert_eq!(pods[0].count, 3);
    }

    #[tokio::test]
    async fn zero_count_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_node(dir.path(), "h1");

        let err = add(State(state), Json(pod("web", 0))).await.unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_)));
    }

    #[tokio::test]
    async fn duplicate_pod_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_node(dir.path(), "h1");

        add(State(state.clone()), Json(pod("web", 1))).await.unwrap();
        let err = add(State(state), Json(pod("web", 2))).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn remove_tears_down_local_replicas() {
        let dir = tempfile::tempdir().unwrap();
        let (state, runtime) = test_node(dir.path(), "h1");

        add(State(state.clone()), Json(pod("web", 2))).await.unwrap();
        for name in ["web-0", "web-1"] {
            containers::run(
                State(state.clone()),
                Json(ContainerRecord {
                    name: name.to_string(),
                    image: "nginx".to_string(),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        }
        // A different pod's replica survives the prefix scan.
        containers::run(
            State(state.clone()),
            Json(ContainerRecord {
                name: "web-app-0".to_string(),
                image: "nginx".to_string(),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let name = remove(
            State(state.clone()),
            Json(PodRemoveRequest {
                name: "web".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(name, "web");

        assert!(list(State(state.clone())).await.unwrap().0.is_empty());
        let remaining = state.store.list_containers().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "web-app-0");
        assert_eq!(runtime.list_local().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_unknown_pod_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_node(dir.path(), "h1");

        let err = remove(
            State(state),
            Json(PodRemoveRequest {
                name: "ghost".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
