//! In-memory runtime driver for tests.
//!
//! Mirrors the daemon's observable behavior: ids are handed out at
//! create, only started containers appear in listings, and a running
//! container refuses a plain remove. `kill` drops a container without
//! going through stop, which is how healing tests simulate an
//! out-of-band death.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::driver::ContainerRuntime;
use crate::error::{RuntimeError, RuntimeResult};

#[derive(Debug, Clone)]
struct FakeContainer {
    id: String,
    name: String,
    image: String,
    running: bool,
}

/// A fake local runtime backed by a vector of containers.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    containers: Arc<Mutex<Vec<FakeContainer>>>,
    next_id: Arc<AtomicU64>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a container as if its process died out-of-band.
    pub fn kill(&self, id: &str) {
        let mut containers = self.lock();
        containers.retain(|c| c.id != id);
    }

    /// Whether the runtime currently reports `id` as running.
    pub fn is_running(&self, id: &str) -> bool {
        self.lock().iter().any(|c| c.id == id && c.running)
    }

    /// Image a container was created from, if it still exists.
    pub fn image_of(&self, id: &str) -> Option<String> {
        self.lock()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.image.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FakeContainer>> {
        self.containers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn pull(&self, _image: &str) -> RuntimeResult<()> {
        Ok(())
    }

    async fn create(&self, image: &str, name: &str) -> RuntimeResult<String> {
        let mut containers = self.lock();
        if containers.iter().any(|c| c.name == name) {
            return Err(RuntimeError::Container(format!(
                "container name {name} already in use"
            )));
        }
        let id = format!("fake-{:08x}", self.next_id.fetch_add(1, Ordering::Relaxed));
        containers.push(FakeContainer {
            id: id.clone(),
            name: name.to_string(),
            image: image.to_string(),
            running: false,
        });
        Ok(id)
    }

    async fn start(&self, id: &str) -> RuntimeResult<()> {
        let mut containers = self.lock();
        match containers.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.running = true;
                Ok(())
            }
            None => Err(RuntimeError::UnknownContainer(id.to_string())),
        }
    }

    async fn stop(&self, id: &str) -> RuntimeResult<()> {
        let mut containers = self.lock();
        match containers.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.running = false;
                Ok(())
            }
            None => Err(RuntimeError::UnknownContainer(id.to_string())),
        }
    }

    async fn remove(&self, id: &str) -> RuntimeResult<()> {
        let mut containers = self.lock();
        match containers.iter().position(|c| c.id == id) {
            Some(pos) if containers[pos].running => Err(RuntimeError::Container(format!(
                "cannot remove running container {id}"
            ))),
            Some(pos) => {
                containers.remove(pos);
                Ok(())
            }
            None => Err(RuntimeError::UnknownContainer(id.to_string())),
        }
    }

    async fn list_local(&self) -> RuntimeResult<Vec<String>> {
        Ok(self
            .lock()
            .iter()
            .filter(|c| c.running)
            .map(|c| c.id.clone())
            .collect())
    }
}
