//! berth-scheduler — reconciliation loop and placement.
//!
//! The scheduler compares desired state (Pod records) against observed
//! state (runtime listings on the owning hosts) and converges them: stale
//! Container records are reaped, missing replicas are placed first-fit
//! and launched on their chosen host.
//!
//! # Coordination
//!
//! A scheduler task runs on every node, but only the holder of the TTL
//! lease at `/rws/scheduler/leader` executes ticks. Even without the
//! lease the creation race stays benign: container records are created
//! atomically keyed on the replica name, and the losing run's container
//! is reaped by the run handler.

pub mod error;
pub mod lease;
pub mod placement;
pub mod reconciler;

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use error::{SchedulerError, SchedulerResult};
pub use lease::LeaderLease;
pub use placement::{first_fit, ResourceRequest};
pub use reconciler::{Reconciler, TickStats};

use berth_cluster::PeerClient;
use berth_state::Store;

/// The periodic reconciliation driver for one node.
pub struct Scheduler {
    reconciler: Reconciler,
    lease: LeaderLease,
    interval: Duration,
}

impl Scheduler {
    /// Build a scheduler for the node identified by `local_host`.
    ///
    /// The leader lease TTL is three intervals, so leadership survives a
    /// slow tick but moves on when a holder goes away.
    pub fn new(
        store: Store,
        peers: PeerClient,
        local_host: impl Into<String>,
        default_port: u16,
        interval: Duration,
    ) -> Self {
        let local_host = local_host.into();
        Self {
            reconciler: Reconciler::new(store.clone(), peers, default_port),
            lease: LeaderLease::new(store, local_host, interval * 3),
            interval,
        }
    }

    /// Run ticks until the shutdown channel flips.
    ///
    /// Ticks process then sleep: the first one fires as soon as the loop
    /// starts, so a freshly added pod does not wait out a full interval
    /// behind a newly started node.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "scheduler started");
        self.step().await;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => self.step().await,
                _ = shutdown.changed() => break,
            }
        }
        info!("scheduler stopped");
    }

    async fn step(&self) {
        match self.lease.try_acquire().await {
            Ok(true) => {}
            Ok(false) => {
                debug!("another node holds the scheduler lease");
                return;
            }
            Err(e) => {
                warn!(error = %e, "scheduler lease check failed");
                return;
            }
        }

        match self.reconciler.tick().await {
            Ok(stats) => {
                if stats.is_noop() {
                    debug!("reconcile tick: nothing to do");
                } else {
                    info!(
                        pods = stats.pods_reconciled,
                        stale_removed = stats.stale_removed,
                        launched = stats.launched,
                        failed = stats.failed,
                        "reconcile tick complete"
                    );
                }
            }
            Err(e) => warn!(error = %e, "reconcile tick failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_state::{keys, KvStore};

    #[tokio::test]
    async fn first_tick_fires_without_waiting_an_interval() {
        let store = Store::new(KvStore::open_in_memory());
        let scheduler = Scheduler::new(
            store.clone(),
            PeerClient::new().unwrap(),
            "h1",
            8888,
            Duration::from_secs(3600),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        // The startup tick takes the scheduler lease long before the
        // one-hour interval could elapse.
        let mut held = false;
        for _ in 0..100 {
            if store.kv().get(keys::SCHEDULER_LEADER_KEY).await.is_ok() {
                held = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(held, "startup tick never took the lease");

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
