//! StorageService — upload, download, remove, list, size.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use berth_cluster::PeerClient;
use berth_runtime::Probe;
use berth_state::{FileRecord, StateError, Store};

use crate::error::{StorageError, StorageResult};

/// Cluster file storage, bound to this node's data directory.
#[derive(Clone)]
pub struct StorageService {
    data_dir: PathBuf,
    store: Store,
    peers: PeerClient,
    probe: Arc<dyn Probe>,
    local_host: String,
    /// Fallback port for owners missing from the host registry.
    listen_port: u16,
}

impl StorageService {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        store: Store,
        peers: PeerClient,
        probe: Arc<dyn Probe>,
        local_host: impl Into<String>,
        listen_port: u16,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            store,
            peers,
            probe,
            local_host: local_host.into(),
            listen_port,
        }
    }

    /// Store `body` under `name`, locally when disk allows, otherwise on
    /// the first registered peer with room.
    pub async fn upload(&self, name: &str, body: Bytes) -> StorageResult<()> {
        validate_name(name)?;

        match self.store.get_file(name).await {
            Ok(_) => return Err(StorageError::Conflict(name.to_string())),
            Err(StateError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let size = body.len() as u64;
        if self.probe.snapshot().disk >= size {
            return self.upload_local(name, body).await;
        }

        debug!(%name, size, "local disk full, spilling over");
        self.spill_over(name, body).await
    }

    async fn upload_local(&self, name: &str, body: Bytes) -> StorageResult<()> {
        let size = body.len() as u64;
        let record = FileRecord {
            name: name.to_string(),
            host: self.local_host.clone(),
            size,
            replicas: 1,
        };

        // The atomic record create arbitrates concurrent uploads of one
        // name; only the winner touches the shared data directory.
        match self.store.create_file(&record).await {
            Ok(()) => {}
            Err(StateError::Conflict(_)) => return Err(StorageError::Conflict(name.to_string())),
            Err(e) => return Err(e.into()),
        }

        let path = self.local_path(name);
        let written = match tokio::fs::write(&path, &body).await {
            Ok(()) => set_file_mode(&path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Roll the record back so it never points at missing bytes.
            if let Err(del) = self.store.delete_file(name).await {
                warn!(%name, error = %del, "failed to roll back file record");
            }
            return Err(e.into());
        }

        info!(%name, size, "file stored locally");
        Ok(())
    }

    /// Forward the buffered body to the first registered host whose live
    /// probe reports room, in KV-list order.
    async fn spill_over(&self, name: &str, body: Bytes) -> StorageResult<()> {
        let size = body.len() as u64;
        for host in self.store.list_hosts().await? {
            if host.name == self.local_host {
                continue;
            }
            let addr = host.addr();
            let info = match self.peers.host_info(&addr).await {
                Ok(info) => info,
                Err(e) => {
                    warn!(%addr, error = %e, "host probe failed during spill-over");
                    continue;
                }
            };
            if info.disk < size {
                continue;
            }
            match self.peers.upload(&addr, name, body.clone()).await {
                Ok(()) => {
                    info!(%name, size, owner = %host.name, "file spilled over");
                    return Ok(());
                }
                Err(e) => {
                    warn!(%addr, error = %e, "spill-over upload failed");
                    continue;
                }
            }
        }
        Err(StorageError::NoCapacity {
            name: name.to_string(),
            size,
        })
    }

    /// Fetch a file's bytes, proxying to the owner when remote.
    pub async fn download(&self, name: &str) -> StorageResult<Bytes> {
        validate_name(name)?;
        let record = self.store.get_file(name).await?;

        if record.host == self.local_host {
            let data = tokio::fs::read(self.local_path(name)).await?;
            return Ok(Bytes::from(data));
        }

        let addr = self.owner_addr(&record.host).await?;
        Ok(self.peers.download(&addr, name).await?)
    }

    /// Unlink a file's bytes (locally or on the owner) and delete its
    /// record. The record is removed even when the unlink fails.
    pub async fn remove(&self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        let record = self.store.get_file(name).await?;

        if record.host == self.local_host {
            if let Err(e) = tokio::fs::remove_file(self.local_path(name)).await {
                warn!(%name, error = %e, "file unlink failed, removing record anyway");
            }
        } else {
            let addr = self.owner_addr(&record.host).await?;
            // The owner deletes the record itself on success.
            if let Err(e) = self.peers.remove_file(&addr, name).await {
                warn!(%name, owner = %record.host, error = %e,
                    "remote unlink failed, removing record anyway");
            }
        }

        match self.store.delete_file(name).await {
            Ok(()) => {}
            // Already gone when the owner handled the proxied remove.
            Err(StateError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        info!(%name, "file removed");
        Ok(())
    }

    /// Every File record in the cluster.
    pub async fn list(&self) -> StorageResult<Vec<FileRecord>> {
        Ok(self.store.list_files().await?)
    }

    /// Recorded size of a file.
    pub async fn file_size(&self, name: &str) -> StorageResult<u64> {
        validate_name(name)?;
        Ok(self.store.get_file(name).await?.size)
    }

    fn local_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Address of a file's owning host, via the host registry.
    async fn owner_addr(&self, host: &str) -> StorageResult<String> {
        Ok(match self.store.find_host(host).await? {
            Some(h) => h.addr(),
            None => format!("{host}:{}", self.listen_port),
        })
    }
}

/// Reject names that would escape the data directory or collide with the
/// path routing.
fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Data files are written world-readable, owner-writable.
async fn set_file_mode(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).await
}
