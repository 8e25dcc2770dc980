//! berth-state — cluster metadata model for berth.
//!
//! All persistent cluster state lives in an external strongly-consistent
//! key/value store (etcd) under four directories. This crate provides:
//!
//! - [`KvStore`] — a thin gateway over the KV with bounded deadlines and
//!   an in-memory backend for tests
//! - the record types persisted as JSON values ([`FileRecord`],
//!   [`HostRecord`], [`ContainerRecord`], [`PodRecord`])
//! - [`Store`] — typed per-entity operations over the gateway
//!
//! # Architecture
//!
//! The KV is the single source of truth for the cluster: local filesystem
//! data and local runtime state are caches. Mutual exclusion between nodes
//! rides entirely on the KV's atomic create-if-absent primitive; there is
//! no in-process locking of the metadata model.
//!
//! The `KvStore` and `Store` are `Clone` + `Send` + `Sync` and can be
//! shared across async tasks.

pub mod error;
pub mod keys;
pub mod kv;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use kv::KvStore;
pub use store::Store;
pub use types::*;
