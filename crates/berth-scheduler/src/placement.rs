//! First-fit placement over registered hosts.
//!
//! Hosts are tried in KV-list order and probed live; the first one whose
//! reported free resources satisfy the request wins. Ties break by
//! iteration order, so placement is deterministic for a stable KV
//! snapshot. Unreachable hosts are skipped, not failures.

use tracing::debug;

use berth_cluster::PeerClient;
use berth_state::{HostRecord, Store};

use crate::error::{SchedulerError, SchedulerResult};

/// Per-replica resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRequest {
    pub disk: u64,
    pub memory: u64,
    pub cores: u64,
}

impl ResourceRequest {
    /// Whether a live host snapshot satisfies this request.
    fn fits(&self, host: &HostRecord) -> bool {
        host.disk >= self.disk && host.memory >= self.memory && host.cores >= self.cores
    }
}

/// Pick the first registered host with capacity for `request`.
pub async fn first_fit(
    store: &Store,
    peers: &PeerClient,
    request: &ResourceRequest,
) -> SchedulerResult<HostRecord> {
    for host in store.list_hosts().await? {
        let live = match peers.host_info(&host.addr()).await {
            Ok(live) => live,
            Err(e) => {
                debug!(host = %host.name, error = %e, "host probe failed, skipping");
                continue;
            }
        };
        if request.fits(&live) {
            debug!(host = %host.name, "placement found");
            return Ok(host);
        }
    }
    Err(SchedulerError::NoCapacity(format!(
        "disk={} memory={} cores={}",
        request.disk, request.memory, request.cores
    )))
}
