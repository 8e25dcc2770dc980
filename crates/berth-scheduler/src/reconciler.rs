//! The reconciler: converge Container records with Pod specs.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use berth_cluster::PeerClient;
use berth_state::{ContainerRecord, PodRecord, StateError, Store};

use crate::error::{SchedulerError, SchedulerResult};
use crate::placement::{first_fit, ResourceRequest};

/// One node's reconciler over the shared metadata store.
pub struct Reconciler {
    store: Store,
    peers: PeerClient,
    /// Fallback port for hosts missing from the registry.
    default_port: u16,
}

/// Counters from one reconciliation tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickStats {
    pub pods_reconciled: usize,
    pub pods_failed: usize,
    pub stale_removed: usize,
    pub launched: usize,
    pub failed: usize,
}

impl TickStats {
    pub fn is_noop(&self) -> bool {
        self.stale_removed == 0 && self.launched == 0 && self.failed == 0 && self.pods_failed == 0
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PodStats {
    stale_removed: usize,
    launched: usize,
    failed: usize,
}

impl Reconciler {
    pub fn new(store: Store, peers: PeerClient, default_port: u16) -> Self {
        Self {
            store,
            peers,
            default_port,
        }
    }

    /// Run a single reconciliation pass over every pod.
    ///
    /// Per-pod failures are logged and counted, never fatal to the tick;
    /// the next tick retries.
    pub async fn tick(&self) -> SchedulerResult<TickStats> {
        let pods = self.store.list_pods().await?;
        let mut stats = TickStats::default();
        if pods.is_empty() {
            debug!("no pods defined");
            return Ok(stats);
        }

        for pod in &pods {
            match self.reconcile_pod(pod).await {
                Ok(pod_stats) => {
                    stats.pods_reconciled += 1;
                    stats.stale_removed += pod_stats.stale_removed;
                    stats.launched += pod_stats.launched;
                    stats.failed += pod_stats.failed;
                }
                Err(e) => {
                    warn!(pod = %pod.name, error = %e, "pod reconciliation failed");
                    stats.pods_failed += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Reconcile one pod: reap stale records, then fill missing replicas.
    async fn reconcile_pod(&self, pod: &PodRecord) -> SchedulerResult<PodStats> {
        let mut stats = PodStats::default();
        let claimed = self.claimed_records(pod).await?;

        // Live runtime ids, fetched once per owning host. `None` marks a
        // host that did not answer; its records are kept rather than
        // reaped on a transient failure.
        let mut live_ids: HashMap<String, Option<HashSet<String>>> = HashMap::new();
        let mut alive: Vec<ContainerRecord> = Vec::new();

        for record in claimed {
            // Only records running the pod's image count as replicas; a
            // colliding name with a different image is an interloper and
            // its record is reaped so the index frees up.
            if record.image != pod.image {
                debug!(
                    name = %record.name,
                    image = %record.image,
                    wanted = %pod.image,
                    "container record image does not match pod"
                );
                self.reap_record(&record.name, &mut stats).await?;
                continue;
            }
            if !live_ids.contains_key(&record.host) {
                let fetched = self.fetch_runtime_ids(&record.host).await;
                live_ids.insert(record.host.clone(), fetched);
            }
            match &live_ids[&record.host] {
                Some(ids) if !ids.contains(&record.id) => {
                    debug!(name = %record.name, host = %record.host, "stale container record");
                    self.reap_record(&record.name, &mut stats).await?;
                }
                _ => alive.push(record),
            }
        }

        let mut used: HashSet<u64> = alive
            .iter()
            .filter_map(|c| c.replica_index(&pod.name))
            .collect();
        let need = pod.count.saturating_sub(alive.len() as u64);
        debug!(
            pod = %pod.name,
            desired = pod.count,
            alive = alive.len(),
            need,
            "pod replica state"
        );

        for _ in 0..need {
            let index = smallest_free_index(&used);
            used.insert(index);
            let name = pod.replica_name(index);

            let request = ResourceRequest {
                disk: pod.disk,
                memory: pod.memory,
                cores: pod.cores,
            };
            let host = match first_fit(&self.store, &self.peers, &request).await {
                Ok(host) => host,
                Err(SchedulerError::NoCapacity(req)) => {
                    warn!(pod = %pod.name, replica = %name, request = %req, "no host with capacity");
                    stats.failed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let spec = ContainerRecord {
                image: pod.image.clone(),
                name: name.clone(),
                disk: pod.disk,
                memory: pod.memory,
                cores: pod.cores,
                host: host.name.clone(),
                id: String::new(),
            };
            match self.peers.run_container(&host.addr(), &spec).await {
                Ok(id) => {
                    info!(pod = %pod.name, replica = %name, host = %host.name, %id, "replica launched");
                    stats.launched += 1;
                }
                Err(e) => {
                    warn!(pod = %pod.name, replica = %name, host = %host.name, error = %e,
                        "replica launch failed");
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Delete a stale container record, tolerating a concurrent
    /// reconciler getting there first.
    async fn reap_record(&self, name: &str, stats: &mut PodStats) -> SchedulerResult<()> {
        match self.store.delete_container(name).await {
            Ok(()) => stats.stale_removed += 1,
            Err(StateError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Container records claimed by `pod`: name prefix `{pod}-` with a
    /// numeric replica suffix.
    async fn claimed_records(&self, pod: &PodRecord) -> SchedulerResult<Vec<ContainerRecord>> {
        let prefix = format!("{}-", pod.name);
        Ok(self
            .store
            .list_containers_with_prefix(&prefix)
            .await?
            .into_iter()
            .filter(|c| c.replica_index(&pod.name).is_some())
            .collect())
    }

    async fn fetch_runtime_ids(&self, host: &str) -> Option<HashSet<String>> {
        let addr = match self.store.find_host(host).await {
            Ok(Some(h)) => h.addr(),
            Ok(None) => format!("{host}:{}", self.default_port),
            Err(e) => {
                warn!(%host, error = %e, "host lookup failed");
                return None;
            }
        };
        match self.peers.list_runtime_ids(&addr).await {
            Ok(ids) => Some(ids.into_iter().collect()),
            Err(e) => {
                warn!(%host, error = %e, "host unreachable, keeping its records");
                None
            }
        }
    }
}

/// Smallest non-negative integer not present in `used`.
fn smallest_free_index(used: &HashSet<u64>) -> u64 {
    (0..).find(|i| !used.contains(i)).unwrap_or(0)
}
