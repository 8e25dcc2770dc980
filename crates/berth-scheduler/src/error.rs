//! Scheduler error types.

use thiserror::Error;

use berth_cluster::ClusterError;
use berth_state::StateError;

/// Result type alias for scheduling operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors that can occur during scheduling.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No registered host satisfies the resource request.
    #[error("no host with capacity: {0}")]
    NoCapacity(String),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("peer error: {0}")]
    Peer(#[from] ClusterError),
}
