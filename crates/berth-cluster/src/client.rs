//! PeerClient — HTTP calls against peer hosts.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Response;
use tracing::debug;

use berth_state::{ContainerRecord, HostRecord};

use crate::error::{ClusterError, ClusterResult};

/// Timeout applied to every peer call.
const PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the per-host HTTP surface of peer nodes.
///
/// `addr` arguments are `host:port` pairs, normally taken from a
/// registered [`HostRecord`].
#[derive(Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new() -> ClusterResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(PEER_TIMEOUT)
            .build()
            .map_err(|e| ClusterError::Transport(e.to_string()))?;
        Ok(Self { http })
    }

    /// Probe a host's live resource snapshot.
    pub async fn host_info(&self, addr: &str) -> ClusterResult<HostRecord> {
        let url = format!("http://{addr}/host_info");
        debug!(%url, "probing host");
        let resp = check(self.http.get(&url).send().await?).await?;
        resp.json()
            .await
            .map_err(|e| ClusterError::Decode(e.to_string()))
    }

    /// Forward an upload body to a peer's storage service.
    pub async fn upload(&self, addr: &str, name: &str, body: Bytes) -> ClusterResult<()> {
        let url = format!("http://{addr}/storage_upload/{name}");
        debug!(%url, size = body.len(), "forwarding upload");
        check(
            self.http
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(body)
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    /// Fetch a file's bytes from its owning host.
    pub async fn download(&self, addr: &str, name: &str) -> ClusterResult<Bytes> {
        let url = format!("http://{addr}/storage_download/{name}");
        let resp = check(self.http.get(&url).send().await?).await?;
        resp.bytes()
            .await
            .map_err(|e| ClusterError::Decode(e.to_string()))
    }

    /// Ask the owning host to unlink a file.
    pub async fn remove_file(&self, addr: &str, name: &str) -> ClusterResult<()> {
        let url = format!("http://{addr}/storage_remove/{name}");
        check(self.http.get(&url).send().await?).await?;
        Ok(())
    }

    /// Ask the owning host for a file's recorded size.
    pub async fn file_size(&self, addr: &str, name: &str) -> ClusterResult<u64> {
        let url = format!("http://{addr}/storage_file_size/{name}");
        let resp = check(self.http.get(&url).send().await?).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| ClusterError::Decode(e.to_string()))?;
        text.trim()
            .parse()
            .map_err(|e| ClusterError::Decode(format!("file size {text:?}: {e}")))
    }

    /// Run a container on a chosen host, returning the runtime id.
    pub async fn run_container(&self, addr: &str, spec: &ContainerRecord) -> ClusterResult<String> {
        let url = format!("http://{addr}/container_run");
        debug!(%url, name = %spec.name, image = %spec.image, "dispatching container run");
        let resp = check(self.http.post(&url).json(spec).send().await?).await?;
        resp.text()
            .await
            .map_err(|e| ClusterError::Decode(e.to_string()))
    }

    /// Forward a container stop to its owning host.
    pub async fn stop_container(&self, addr: &str, spec: &ContainerRecord) -> ClusterResult<()> {
        let url = format!("http://{addr}/container_stop");
        check(self.http.post(&url).json(spec).send().await?).await?;
        Ok(())
    }

    /// Forward a container remove to its owning host.
    pub async fn remove_container(&self, addr: &str, spec: &ContainerRecord) -> ClusterResult<()> {
        let url = format!("http://{addr}/container_remove");
        check(self.http.post(&url).json(spec).send().await?).await?;
        Ok(())
    }

    /// Runtime ids currently live on a host.
    pub async fn list_runtime_ids(&self, addr: &str) -> ClusterResult<Vec<String>> {
        let url = format!("http://{addr}/container_list");
        let resp = check(self.http.get(&url).send().await?).await?;
        resp.json()
            .await
            .map_err(|e| ClusterError::Decode(e.to_string()))
    }
}

/// Turn a non-success response into [`ClusterError::Status`], keeping the
/// peer's text body for the log line.
async fn check(resp: Response) -> ClusterResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClusterError::Status { status, body })
}
