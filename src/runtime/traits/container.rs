// ABOUTME: Container operations trait for the container engine.
// ABOUTME: Create, start, stop, remove, rename, inspect, and list containers.

use super::shared_types::{ContainerConfig, ContainerInfo};
use crate::types::{AppName, ContainerId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Label carrying the owning application.
pub const APP_LABEL: &str = "swapdock.app";
/// Label carrying the service name inside the application.
pub const SERVICE_LABEL: &str = "swapdock.service";
/// Label carrying the identity that deployed the container.
pub const OWNER_LABEL: &str = "swapdock.owner";
/// Marks containers created by this tool.
pub const MANAGED_LABEL: &str = "swapdock.managed";

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Create a container and return the id the engine assigned to it.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Stop a running container, killing it once `timeout` has elapsed.
    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError>;

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;

    async fn rename_container(
        &self,
        id: &ContainerId,
        new_name: &str,
    ) -> Result<(), ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Filter by label (key=value).
    pub labels: HashMap<String, String>,
    /// Filter by name (engine does a partial match).
    pub name: Option<String>,
    /// Include stopped containers.
    pub all: bool,
}

impl ContainerFilters {
    /// Every container (running or not) belonging to an application.
    pub fn for_app(app: &AppName) -> Self {
        let mut labels = HashMap::new();
        labels.insert(APP_LABEL.to_string(), app.to_string());
        Self {
            labels,
            name: None,
            all: true,
        }
    }
}

/// Summary information about a container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    /// Name without the leading slash.
    pub name: String,
    pub image: String,
    /// Engine state string (`running`, `exited`, ...).
    pub state: String,
    pub labels: HashMap<String, String>,
}

impl ContainerSummary {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("engine error: {0}")]
    Engine(String),
}
