//! berth-api — the HTTP surface of a berth node.
//!
//! Every node serves the same flat route table and plays two roles at
//! once: controller (cluster-level commands that read/write KV and fan
//! out to peers) and worker (host-local commands from peer controllers
//! acting on the local runtime or filesystem). Handlers short-circuit
//! peer calls when the target host is the local one.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/storage_upload/{name}` | Store raw bytes (spill-over on full disk) |
//! | GET | `/storage_download/{name}` | Fetch bytes, proxied from the owner |
//! | GET | `/storage_remove/{name}` | Unlink bytes and delete the record |
//! | GET | `/storage_list` | All File records |
//! | GET | `/storage_file_size/{name}` | Recorded size, decimal text |
//! | POST | `/container_run` | Pull/create/start locally, record in KV |
//! | POST | `/container_stop` | Stop, routed to the owning host |
//! | POST | `/container_remove` | Remove, routed to the owning host |
//! | GET | `/container_list` | Runtime ids live on this node |
//! | GET | `/container_list_all` | All Container records |
//! | POST | `/pod_add` | Create a pod spec |
//! | POST | `/pod_remove` | Tear down replicas, delete the spec |
//! | GET | `/pod_list` | All Pod records |
//! | POST | `/host_add` | Probe and register a host |
//! | POST | `/host_remove` | Deregister a host |
//! | GET | `/host_list` | All registered hosts |
//! | GET | `/host_info` | Live local resource snapshot |
//! | GET | `/` | Read-only HTML dashboard |

pub mod containers;
pub mod dashboard;
pub mod error;
pub mod hosts;
pub mod pods;
pub mod storage;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use berth_cluster::PeerClient;
use berth_runtime::{ContainerRuntime, Probe};
use berth_state::Store;
use berth_storage::StorageService;

pub use error::ApiError;

/// Shared state for all handlers on one node.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub probe: Arc<dyn Probe>,
    pub peers: PeerClient,
    pub storage: StorageService,
    /// This node's advertised host name.
    pub local_host: String,
    /// This node's listen port, also the fallback for unregistered hosts.
    pub listen_port: u16,
}

impl AppState {
    /// `host:port` address for a peer, via the host registry.
    pub async fn peer_addr(&self, host: &str) -> String {
        match self.store.find_host(host).await {
            Ok(Some(h)) => h.addr(),
            _ => format!("{host}:{}", self.listen_port),
        }
    }
}

/// Build the complete node router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/storage_upload/{name}", post(storage::upload))
        .route("/storage_download/{name}", get(storage::download))
        .route("/storage_remove/{name}", get(storage::remove))
        .route("/storage_list", get(storage::list))
        .route("/storage_file_size/{name}", get(storage::file_size))
        .route("/container_run", post(containers::run))
        .route("/container_stop", post(containers::stop))
        .route("/container_remove", post(containers::remove))
        .route("/container_list", get(containers::list_local))
        .route("/container_list_all", get(containers::list_all))
        .route("/pod_add", post(pods::add))
        .route("/pod_remove", post(pods::remove))
        .route("/pod_list", get(pods::list))
        .route("/host_add", post(hosts::add))
        .route("/host_remove", post(hosts::remove))
        .route("/host_list", get(hosts::list))
        .route("/host_info", get(hosts::info))
        .route("/", get(dashboard::index))
        // Upload sizes are the caller's concern, not the transport's.
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}
