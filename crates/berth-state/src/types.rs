//! Record types persisted in the berth metadata store.
//!
//! All four entities are JSON-serialized into KV values. The record a key
//! points at is canonical; any field mirrored elsewhere (a file on disk, a
//! runtime container) is a cache of it.

use serde::{Deserialize, Serialize};

use crate::keys;

/// A single named blob whose bytes live on exactly one host's data
/// directory.
///
/// Invariant: for every File record the named host currently has a regular
/// file of that name in its data directory. `replicas` is reserved for
/// multi-copy support and is always 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    /// Host name owning the bytes.
    pub host: String,
    /// Size in bytes.
    pub size: u64,
    pub replicas: u64,
}

/// A registered worker host, snapshotted at registration time.
///
/// `disk` and `memory` are free-byte counts captured when the host was
/// added, not live values; placement re-probes `/host_info` instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostRecord {
    pub name: String,
    pub port: u16,
    /// Free disk bytes at registration.
    pub disk: u64,
    /// Available memory bytes at registration.
    pub memory: u64,
    pub cores: u64,
}

/// One running container: its placement and local runtime id.
///
/// `name` is cluster-unique. Created when a run succeeds, destroyed when a
/// remove succeeds. The resource fields carry the request the container
/// was placed with.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContainerRecord {
    pub image: String,
    pub name: String,
    pub disk: u64,
    pub memory: u64,
    pub cores: u64,
    /// Host name the container runs on.
    pub host: String,
    /// Local runtime id on `host`.
    pub id: String,
}

/// Declarative desired state: `count` replicas of `image` with per-replica
/// resource requests.
///
/// The reconciler drives the number of Container records named
/// `{name}-{index}` to `count`. Replica indices are the smallest free
/// non-negative integers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PodRecord {
    pub name: String,
    pub image: String,
    pub count: u64,
    pub cores: u64,
    pub memory: u64,
    pub disk: u64,
}

impl FileRecord {
    /// KV key for this record.
    pub fn key(&self) -> String {
        keys::file_key(&self.name)
    }
}

impl HostRecord {
    /// KV key for this record.
    pub fn key(&self) -> String {
        keys::host_key(&self.name, self.port)
    }

    /// `host:port` address for peer HTTP calls.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.name, self.port)
    }
}

impl ContainerRecord {
    /// KV key for this record.
    pub fn key(&self) -> String {
        keys::container_key(&self.name)
    }

    /// The replica index if this record's name is `{pod}-{index}`.
    pub fn replica_index(&self, pod: &str) -> Option<u64> {
        self.name
            .strip_prefix(pod)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|idx| idx.parse().ok())
    }
}

impl PodRecord {
    /// KV key for this record.
    pub fn key(&self) -> String {
        keys::pod_key(&self.name)
    }

    /// Name of the replica with the given index.
    pub fn replica_name(&self, index: u64) -> String {
        format!("{}-{}", self.name, index)
    }
}
