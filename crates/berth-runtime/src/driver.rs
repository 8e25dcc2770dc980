//! The container runtime driver interface.

use async_trait::async_trait;

use crate::error::RuntimeResult;

/// Local container operations, as the control plane consumes them.
///
/// Implementations act only on this node's runtime; routing an operation
/// to the host owning a container is the caller's job.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Ensure `image` is present locally. Idempotent.
    async fn pull(&self, image: &str) -> RuntimeResult<()>;

    /// Create a container from `image` under `name`, returning the
    /// runtime id.
    async fn create(&self, image: &str, name: &str) -> RuntimeResult<String>;

    /// Start a created container.
    async fn start(&self, id: &str) -> RuntimeResult<()>;

    /// Stop a running container gracefully with the runtime's default
    /// timeout.
    async fn stop(&self, id: &str) -> RuntimeResult<()>;

    /// Remove a stopped container.
    async fn remove(&self, id: &str) -> RuntimeResult<()>;

    /// Runtime ids of the containers currently running on this node, in
    /// the runtime's reporting order.
    async fn list_local(&self) -> RuntimeResult<Vec<String>>;
}
