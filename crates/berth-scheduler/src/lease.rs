//! Scheduler leader lease.
//!
//! One TTL key at `/rws/scheduler/leader` holds the current leader's host
//! name. A node that creates or still owns the key runs the tick; anyone
//! else skips it and retries next interval. When a holder stops renewing,
//! the key expires and leadership moves on.

use std::time::Duration;

use berth_state::{StateResult, Store};

/// Handle to this node's claim on the scheduler lease.
pub struct LeaderLease {
    store: Store,
    holder: String,
    ttl: Duration,
}

impl LeaderLease {
    pub fn new(store: Store, holder: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            holder: holder.into(),
            ttl,
        }
    }

    /// Take or renew the lease. `true` means this node leads right now.
    pub async fn try_acquire(&self) -> StateResult<bool> {
        self.store
            .try_acquire_scheduler_lease(&self.holder, self.ttl)
            .await
    }
}
