//! berth-cluster — peer HTTP client for cross-host operations.
//!
//! Every node exposes the same HTTP surface; cluster-level handlers
//! compose the node-local handlers of their peers through this client.
//! Callers short-circuit when the target host is the local one, so every
//! method here really does go over the wire.
//!
//! All calls carry the client-level timeout; a peer that does not answer
//! within it surfaces as [`ClusterError::Transport`].

pub mod client;
pub mod error;

pub use client::PeerClient;
pub use error::{ClusterError, ClusterResult};
