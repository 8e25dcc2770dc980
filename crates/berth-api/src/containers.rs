//! Container endpoints.
//!
//! `run` always executes on the node that receives it; choosing that node
//! is the caller's job (the reconciler, or pod add via placement). Stop
//! and remove accept a cluster-level request anywhere and forward to the
//! owning host when it is not the local one.

use axum::extract::State;
use axum::Json;
use tracing::{debug, info, warn};

use berth_state::{ContainerRecord, StateError};

use crate::error::ApiError;
use crate::AppState;

/// POST /container_run
///
/// Pull, create, and start via the local runtime, then atomically record
/// the container in KV. Losing the record race reaps the just-started
/// container, which is what keeps concurrent schedulers benign.
pub async fn run(
    State(state): State<AppState>,
    Json(spec): Json<ContainerRecord>,
) -> Result<String, ApiError> {
    if spec.name.is_empty() || spec.image.is_empty() {
        return Err(ApiError::Invalid(
            "container run requires image and name".to_string(),
        ));
    }
    debug!(name = %spec.name, image = %spec.image, "container run");

    state.runtime.pull(&spec.image).await?;
    let id = state.runtime.create(&spec.image, &spec.name).await?;
    state.runtime.start(&id).await?;

    let record = ContainerRecord {
        host: state.local_host.clone(),
        id: id.clone(),
        ..spec
    };
    match state.store.create_container(&record).await {
        Ok(()) => {
            info!(name = %record.name, %id, "container running");
            Ok(id)
        }
        Err(StateError::Conflict(_)) => {
            // Another node won the name; our container is surplus.
            if let Err(e) = state.runtime.stop(&id).await {
                warn!(%id, error = %e, "failed to stop surplus container");
            } else if let Err(e) = state.runtime.remove(&id).await {
                warn!(%id, error = %e, "failed to remove surplus container");
            }
            Err(ApiError::Conflict(record.name))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /container_stop
pub async fn stop(
    State(state): State<AppState>,
    Json(body): Json<ContainerRecord>,
) -> Result<&'static str, ApiError> {
    let record = state.store.get_container(&body.name).await?;
    debug!(name = %record.name, host = %record.host, "container stop");

    if record.host == state.local_host {
        state.runtime.stop(&record.id).await?;
    } else {
        let addr = state.peer_addr(&record.host).await;
        state.peers.stop_container(&addr, &record).await?;
    }
    Ok("OK")
}

/// POST /container_remove
///
/// Removes the runtime container on its owner and deletes the Container
/// record; the record exists exactly while the container does.
pub async fn remove(
    State(state): State<AppState>,
    Json(body): Json<ContainerRecord>,
) -> Result<&'static str, ApiError> {
    let record = state.store.get_container(&body.name).await?;
    debug!(name = %record.name, host = %record.host, "container remove");

    if record.host == state.local_host {
        state.runtime.remove(&record.id).await?;
    } else {
        let addr = state.peer_addr(&record.host).await;
        state.peers.remove_container(&addr, &record).await?;
    }

    match state.store.delete_container(&record.name).await {
        Ok(()) => {}
        // The owner already deleted it while handling our forward.
        Err(StateError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }
    info!(name = %record.name, "container removed");
    Ok("OK")
}

/// GET /container_list
pub async fn list_local(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.runtime.list_local().await?))
}

/// GET /container_list_all
pub async fn list_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContainerRecord>>, ApiError> {
    Ok(Json(state.store.list_containers().await?))
}
