//! KvStore — thin gateway over the external key/value store.
//!
//! Five operations against directory paths: create (fails if the key
//! exists), set, get (fails if missing), delete (fails if missing), and
//! directory list. Every call against the real backend carries a 5-second
//! deadline; expiry surfaces as [`StateError::Unavailable`]. No caching,
//! no retries.
//!
//! Two backends share the interface: `Etcd` for production (atomic
//! create-if-absent via a create-revision transaction, TTL keys via
//! leases) and `Memory` for tests (a mutex-protected map with per-key
//! expiry and deterministic list order).

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use etcd_client::{Compare, CompareOp, GetOptions, PutOptions, Txn, TxnOp};
use tracing::debug;

use crate::error::{StateError, StateResult};

/// Deadline applied to every call against the external KV.
pub const KV_TIMEOUT: Duration = Duration::from_secs(5);

/// Thin, clonable handle to the cluster KV.
#[derive(Clone)]
pub struct KvStore {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Etcd(etcd_client::Client),
    Memory(Arc<Mutex<BTreeMap<String, MemoryEntry>>>),
}

#[derive(Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

impl KvStore {
    /// Connect to the etcd endpoint. Fatal to the process if this fails.
    pub async fn connect(endpoint: &str) -> StateResult<Self> {
        let client = deadline("connect", etcd_client::Client::connect([endpoint], None)).await?;
        debug!(%endpoint, "kv connected");
        Ok(Self {
            backend: Backend::Etcd(client),
        })
    }

    /// Create an ephemeral in-memory KV (for testing).
    ///
    /// Clones share the same map, so one instance can stand in for the
    /// cluster-wide store across several in-process nodes.
    pub fn open_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(BTreeMap::new()))),
        }
    }

    /// Atomically create `key`; fails with `Conflict` if it exists.
    pub async fn create(&self, key: &str, value: &str) -> StateResult<()> {
        self.create_inner(key, value, None).await
    }

    /// Atomically create `key` with a time-to-live.
    pub async fn create_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StateResult<()> {
        self.create_inner(key, value, Some(ttl)).await
    }

    async fn create_inner(&self, key: &str, value: &str, ttl: Option<Duration>) -> StateResult<()> {
        match &self.backend {
            Backend::Etcd(client) => {
                let options = match ttl {
                    Some(ttl) => Some(self.grant_lease(client.clone(), ttl).await?),
                    None => None,
                };
                let txn = Txn::new()
                    .when(vec![Compare::create_revision(key, CompareOp::Equal, 0)])
                    .and_then(vec![TxnOp::put(key, value, options)]);
                let mut kv = client.kv_client();
                let resp = deadline("create", kv.txn(txn)).await?;
                if !resp.succeeded() {
                    return Err(StateError::Conflict(key.to_string()));
                }
                Ok(())
            }
            Backend::Memory(map) => {
                let now = Instant::now();
                let mut map = map.lock().unwrap_or_else(|e| e.into_inner());
                if map.get(key).is_some_and(|e| e.live(now)) {
                    return Err(StateError::Conflict(key.to_string()));
                }
                map.insert(
                    key.to_string(),
                    MemoryEntry {
                        value: value.to_string(),
                        expires_at: ttl.map(|t| now + t),
                    },
                );
                Ok(())
            }
        }
    }

    /// Unconditionally set `key`.
    pub async fn set(&self, key: &str, value: &str) -> StateResult<()> {
        self.set_inner(key, value, None).await
    }

    /// Unconditionally set `key` with a time-to-live.
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StateResult<()> {
        self.set_inner(key, value, Some(ttl)).await
    }

    async fn set_inner(&self, key: &str, value: &str, ttl: Option<Duration>) -> StateResult<()> {
        match &self.backend {
            Backend::Etcd(client) => {
                let options = match ttl {
                    Some(ttl) => Some(self.grant_lease(client.clone(), ttl).await?),
                    None => None,
                };
                let mut kv = client.kv_client();
                deadline("set", kv.put(key, value, options)).await?;
                Ok(())
            }
            Backend::Memory(map) => {
                let now = Instant::now();
                let mut map = map.lock().unwrap_or_else(|e| e.into_inner());
                map.insert(
                    key.to_string(),
                    MemoryEntry {
                        value: value.to_string(),
                        expires_at: ttl.map(|t| now + t),
                    },
                );
                Ok(())
            }
        }
    }

    /// Read `key`; fails with `NotFound` if missing.
    pub async fn get(&self, key: &str) -> StateResult<String> {
        match &self.backend {
            Backend::Etcd(client) => {
                let mut kv = client.kv_client();
                let resp = deadline("get", kv.get(key, None)).await?;
                match resp.kvs().first() {
                    Some(kv) => kv
                        .value_str()
                        .map(str::to_string)
                        .map_err(|e| StateError::Deserialize(e.to_string())),
                    None => Err(StateError::NotFound(key.to_string())),
                }
            }
            Backend::Memory(map) => {
                let now = Instant::now();
                let map = map.lock().unwrap_or_else(|e| e.into_inner());
                map.get(key)
                    .filter(|e| e.live(now))
                    .map(|e| e.value.clone())
                    .ok_or_else(|| StateError::NotFound(key.to_string()))
            }
        }
    }

    /// Delete `key`; fails with `NotFound` if missing.
    pub async fn delete(&self, key: &str) -> StateResult<()> {
        match &self.backend {
            Backend::Etcd(client) => {
                let mut kv = client.kv_client();
                let resp = deadline("delete", kv.delete(key, None)).await?;
                if resp.deleted() == 0 {
                    return Err(StateError::NotFound(key.to_string()));
                }
                Ok(())
            }
            Backend::Memory(map) => {
                let now = Instant::now();
                let mut map = map.lock().unwrap_or_else(|e| e.into_inner());
                match map.remove(key) {
                    Some(entry) if entry.live(now) => Ok(()),
                    _ => Err(StateError::NotFound(key.to_string())),
                }
            }
        }
    }

    /// List the `(key, value)` pairs directly under `dir`, in key order.
    pub async fn list(&self, dir: &str) -> StateResult<Vec<(String, String)>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        match &self.backend {
            Backend::Etcd(client) => {
                let options = GetOptions::new().with_prefix();
                let mut kv = client.kv_client();
                let resp = deadline("list", kv.get(prefix.as_str(), Some(options))).await?;
                let mut entries = Vec::with_capacity(resp.kvs().len());
                for kv in resp.kvs() {
                    let key = kv
                        .key_str()
                        .map_err(|e| StateError::Deserialize(e.to_string()))?;
                    let value = kv
                        .value_str()
                        .map_err(|e| StateError::Deserialize(e.to_string()))?;
                    entries.push((key.to_string(), value.to_string()));
                }
                Ok(entries)
            }
            Backend::Memory(map) => {
                let now = Instant::now();
                let map = map.lock().unwrap_or_else(|e| e.into_inner());
                Ok(map
                    .range(prefix.clone()..)
                    .take_while(|(k, _)| k.starts_with(&prefix))
                    .filter(|(_, e)| e.live(now))
                    .map(|(k, e)| (k.clone(), e.value.clone()))
                    .collect())
            }
        }
    }

    /// Grant an etcd lease and return put options bound to it.
    async fn grant_lease(
        &self,
        client: etcd_client::Client,
        ttl: Duration,
    ) -> StateResult<PutOptions> {
        let ttl_secs = ttl.as_secs().max(1) as i64;
        let mut leases = client.lease_client();
        let lease = deadline("lease", leases.grant(ttl_secs, None)).await?;
        Ok(PutOptions::new().with_lease(lease.id()))
    }
}

/// Run a KV future under the gateway deadline.
async fn deadline<T, F>(what: &str, fut: F) -> StateResult<T>
where
    F: Future<Output = Result<T, etcd_client::Error>>,
{
    match tokio::time::timeout(KV_TIMEOUT, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(StateError::Unavailable(format!("{what}: {e}"))),
        Err(_) => Err(StateError::Unavailable(format!("{what}: deadline exceeded"))),
    }
}
