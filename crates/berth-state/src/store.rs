//! Store — typed per-entity operations over the KV gateway.
//!
//! Every method JSON-(de)serializes one record type against its directory
//! from [`crate::keys`]. List order follows KV key order, which placement
//! and upload fan-out rely on for determinism.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::keys;
use crate::kv::KvStore;
use crate::types::{ContainerRecord, FileRecord, HostRecord, PodRecord};

/// Typed view of the cluster metadata store.
#[derive(Clone)]
pub struct Store {
    kv: KvStore,
}

impl Store {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// The underlying gateway.
    pub fn kv(&self) -> &KvStore {
        &self.kv
    }

    // ── Files ──────────────────────────────────────────────────────

    /// Atomically create a File record; `Conflict` if the name is taken.
    pub async fn create_file(&self, file: &FileRecord) -> StateResult<()> {
        self.kv.create(&file.key(), &encode(file)?).await?;
        debug!(name = %file.name, host = %file.host, "file record created");
        Ok(())
    }

    /// Resolve a File record; `NotFound` if missing.
    pub async fn get_file(&self, name: &str) -> StateResult<FileRecord> {
        decode(&self.kv.get(&keys::file_key(name)).await?)
    }

    /// Delete a File record; `NotFound` if missing.
    pub async fn delete_file(&self, name: &str) -> StateResult<()> {
        self.kv.delete(&keys::file_key(name)).await
    }

    /// All File records, in KV key order.
    pub async fn list_files(&self) -> StateResult<Vec<FileRecord>> {
        decode_dir(self.kv.list(keys::STORAGE_DIR).await?)
    }

    // ── Hosts ──────────────────────────────────────────────────────

    /// Atomically register a host; `Conflict` on duplicate `name:port`.
    pub async fn create_host(&self, host: &HostRecord) -> StateResult<()> {
        self.kv.create(&host.key(), &encode(host)?).await?;
        debug!(name = %host.name, port = host.port, "host registered");
        Ok(())
    }

    /// Deregister a host; `NotFound` if missing.
    pub async fn delete_host(&self, name: &str, port: u16) -> StateResult<()> {
        self.kv.delete(&keys::host_key(name, port)).await
    }

    /// All registered hosts, in KV key order.
    pub async fn list_hosts(&self) -> StateResult<Vec<HostRecord>> {
        decode_dir(self.kv.list(keys::HOSTS_DIR).await?)
    }

    /// Find a registered host by name (first match in KV order).
    pub async fn find_host(&self, name: &str) -> StateResult<Option<HostRecord>> {
        Ok(self
            .list_hosts()
            .await?
            .into_iter()
            .find(|h| h.name == name))
    }

    // ── Containers ─────────────────────────────────────────────────

    /// Atomically create a Container record; this is the gate that keeps
    /// container names cluster-unique.
    pub async fn create_container(&self, container: &ContainerRecord) -> StateResult<()> {
        self.kv.create(&container.key(), &encode(container)?).await?;
        debug!(name = %container.name, host = %container.host, "container record created");
        Ok(())
    }

    /// Resolve a Container record; `NotFound` if missing.
    pub async fn get_container(&self, name: &str) -> StateResult<ContainerRecord> {
        decode(&self.kv.get(&keys::container_key(name)).await?)
    }

    /// Delete a Container record; `NotFound` if missing.
    pub async fn delete_container(&self, name: &str) -> StateResult<()> {
        self.kv.delete(&keys::container_key(name)).await
    }

    /// All Container records, in KV key order.
    pub async fn list_containers(&self) -> StateResult<Vec<ContainerRecord>> {
        decode_dir(self.kv.list(keys::CONTAINERS_DIR).await?)
    }

    /// Container records whose name starts with `prefix`.
    pub async fn list_containers_with_prefix(
        &self,
        prefix: &str,
    ) -> StateResult<Vec<ContainerRecord>> {
        Ok(self
            .list_containers()
            .await?
            .into_iter()
            .filter(|c| c.name.starts_with(prefix))
            .collect())
    }

    // ── Pods ───────────────────────────────────────────────────────

    /// Atomically create a Pod record; `Conflict` on duplicate name.
    pub async fn create_pod(&self, pod: &PodRecord) -> StateResult<()> {
        self.kv.create(&pod.key(), &encode(pod)?).await?;
        debug!(name = %pod.name, count = pod.count, "pod record created");
        Ok(())
    }

    /// Delete a Pod record; `NotFound` if missing.
    pub async fn delete_pod(&self, name: &str) -> StateResult<()> {
        self.kv.delete(&keys::pod_key(name)).await
    }

    /// All Pod records, in KV key order.
    pub async fn list_pods(&self) -> StateResult<Vec<PodRecord>> {
        decode_dir(self.kv.list(keys::PODS_DIR).await?)
    }

    // ── Scheduler lease ────────────────────────────────────────────

    /// Try to take (or renew) the scheduler leader lease.
    ///
    /// Returns `true` when `holder` owns the lease after the call. Renewal
    /// re-puts the key with a fresh TTL; losing the race returns `false`.
    pub async fn try_acquire_scheduler_lease(
        &self,
        holder: &str,
        ttl: Duration,
    ) -> StateResult<bool> {
        let key = keys::SCHEDULER_LEADER_KEY;
        match self.kv.create_with_ttl(key, holder, ttl).await {
            Ok(()) => Ok(true),
            Err(StateError::Conflict(_)) => match self.kv.get(key).await {
                Ok(current) if current == holder => {
                    self.kv.set_with_ttl(key, holder, ttl).await?;
                    Ok(true)
                }
                Ok(_) => Ok(false),
                // Expired between the create and the get; next tick retries.
                Err(StateError::NotFound(_)) => Ok(false),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

fn encode<T: Serialize>(record: &T) -> StateResult<String> {
    serde_json::to_string(record).map_err(|e| StateError::Serialize(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: &str) -> StateResult<T> {
    serde_json::from_str(value).map_err(|e| StateError::Deserialize(e.to_string()))
}

fn decode_dir<T: DeserializeOwned>(entries: Vec<(String, String)>) -> StateResult<Vec<T>> {
    entries.iter().map(|(_, v)| decode(v)).collect()
}
