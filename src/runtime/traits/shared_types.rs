// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerConfig, ContainerInfo, and their building blocks.

use crate::types::{ContainerId, ImageId, ImageRef, NetworkAlias};
use std::collections::HashMap;
use std::time::Duration;

/// Fully resolved configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub name: String,
    pub image: ImageRef,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMount>,
    /// Overrides the image CMD.
    pub command: Option<Vec<String>>,
    /// Overrides the image ENTRYPOINT.
    pub entrypoint: Option<Vec<String>>,
    pub user: Option<String>,
    pub restart_policy: RestartPolicyConfig,
    pub resources: ResourceLimits,
    pub healthcheck: Option<HealthcheckConfig>,
    pub stop_timeout: Option<Duration>,
    pub read_only: bool,
    /// Network to attach at creation time.
    pub network: Option<String>,
    pub network_aliases: Vec<NetworkAlias>,
}

/// Port mapping configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Published host port; `None` only exposes the container port.
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: Protocol,
    pub host_ip: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// Bind mount or named volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    /// Named volumes have no path separator in their source.
    pub fn is_named_volume(&self) -> bool {
        !self.source.contains('/') && !self.source.starts_with('.') && !self.source.starts_with('~')
    }
}

/// Restart policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartPolicyConfig {
    No,
    Always,
    UnlessStopped,
    OnFailure { max_retries: Option<u32> },
}

impl Default for RestartPolicyConfig {
    fn default() -> Self {
        RestartPolicyConfig::OnFailure {
            max_retries: Some(5),
        }
    }
}

/// Resource limits for a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLimits {
    /// Memory limit in bytes.
    pub memory: Option<u64>,
    /// Relative CPU weight.
    pub cpu_shares: Option<u32>,
    /// CPU quota (1.0 = 1 CPU).
    pub cpus: Option<f64>,
}

/// Engine-native health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthcheckConfig {
    /// `["CMD", ...]`, `["CMD-SHELL", "..."]` or `["NONE"]`.
    pub test: Vec<String>,
    pub interval: Option<Duration>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub start_period: Option<Duration>,
}

/// Information about an existing container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
    /// Image reference from the container config.
    pub image: String,
    /// Id of the image the container runs.
    pub image_id: Option<ImageId>,
    pub state: ContainerState,
    /// Health status, when a health check is configured.
    pub health: Option<HealthState>,
    /// Outputs of the most recent health checks, oldest first.
    pub health_log: Vec<String>,
    /// Whether a health check is configured (and not disabled).
    pub has_healthcheck: bool,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

impl ContainerState {
    /// Whether a stop request makes sense in this state.
    pub fn is_stoppable(&self) -> bool {
        matches!(
            self,
            ContainerState::Running | ContainerState::Paused | ContainerState::Restarting
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Healthy,
    Unhealthy,
    None,
}
