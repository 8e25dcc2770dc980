//! Docker implementation of the runtime driver, via bollard.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, StartContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::StreamExt;
use tracing::{debug, info};

use crate::driver::ContainerRuntime;
use crate::error::{RuntimeError, RuntimeResult};

/// Driver backed by the local Docker daemon.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect with the daemon's local defaults (unix socket or
    /// `DOCKER_HOST`).
    pub fn connect() -> RuntimeResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Connect(e.to_string()))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull(&self, image: &str) -> RuntimeResult<()> {
        debug!(%image, "pulling image");
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };
        let mut progress = self.docker.create_image(Some(options), None, None);
        while let Some(step) = progress.next().await {
            step.map_err(|e| RuntimeError::Pull {
                image: image.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    async fn create(&self, image: &str, name: &str) -> RuntimeResult<String> {
        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };
        let config = Config {
            image: Some(image.to_string()),
            ..Default::default()
        };
        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| RuntimeError::Container(e.to_string()))?;
        info!(%name, %image, id = %created.id, "container created");
        Ok(created.id)
    }

    async fn start(&self, id: &str) -> RuntimeResult<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| RuntimeError::Container(e.to_string()))
    }

    async fn stop(&self, id: &str) -> RuntimeResult<()> {
        // None keeps the daemon's default graceful timeout.
        self.docker
            .stop_container(id, None)
            .await
            .map_err(|e| RuntimeError::Container(e.to_string()))
    }

    async fn remove(&self, id: &str) -> RuntimeResult<()> {
        self.docker
            .remove_container(id, None)
            .await
            .map_err(|e| RuntimeError::Container(e.to_string()))
    }

    async fn list_local(&self) -> RuntimeResult<Vec<String>> {
        let containers = self
            .docker
            .list_containers(None::<ListContainersOptions<String>>)
            .await
            .map_err(|e| RuntimeError::Container(e.to_string()))?;
        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }
}
