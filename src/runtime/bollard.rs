// ABOUTME: Bollard-based container engine implementation.
// ABOUTME: Talks to the Docker API over the local socket.

use crate::runtime::error::{ConnectSnafu, PingSnafu, RuntimeError};
use crate::runtime::traits::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps, ContainerState,
    ContainerSummary, EngineEvent, EventError, EventFilters, EventOps, EventStream, HealthState,
    ImageError, ImageOps, LogError, LogOps, RestartPolicyConfig,
};
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{
    ContainerCreateBody, EndpointSettings, HealthConfig, HostConfig, Mount, MountTypeEnum,
    NetworkingConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, EventsOptions, InspectContainerOptions,
    ListContainersOptions, LogsOptions, RemoveContainerOptions, RemoveImageOptions,
    RenameContainerOptions, StartContainerOptions, StopContainerOptions,
};
use futures::StreamExt;
use snafu::ResultExt;
use std::collections::HashMap;
use std::time::Duration;

/// Seconds the client waits for a single API call.
const CLIENT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn server_status(e: &bollard::errors::Error) -> Option<(u16, &str)> {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.as_str())),
        _ => None,
    }
}

fn map_image_remove_error(e: bollard::errors::Error, image: &ImageId) -> ImageError {
    match server_status(&e) {
        Some((404, _)) => ImageError::NotFound(image.to_string()),
        Some((409, message)) => ImageError::InUse(message.to_string()),
        _ => ImageError::Engine(format!("failed to remove {}: {}", image.short(), e)),
    }
}

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match server_status(&e) {
        Some((404, message)) => ContainerError::ImageNotFound(message.to_string()),
        Some((409, message)) => ContainerError::AlreadyExists(message.to_string()),
        Some((400, message)) => ContainerError::InvalidConfig(message.to_string()),
        _ => ContainerError::Engine(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match server_status(&e) {
        Some((404, message)) => ContainerError::NotFound(message.to_string()),
        Some((304, message)) => ContainerError::AlreadyRunning(message.to_string()),
        _ => ContainerError::Engine(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match server_status(&e) {
        Some((404, message)) => ContainerError::NotFound(message.to_string()),
        Some((304, message)) => ContainerError::NotRunning(message.to_string()),
        _ => ContainerError::Engine(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match server_status(&e) {
        Some((404, message)) => ContainerError::NotFound(message.to_string()),
        _ => ContainerError::Engine(e.to_string()),
    }
}

fn map_container_rename_error(e: bollard::errors::Error) -> ContainerError {
    match server_status(&e) {
        Some((404, message)) => ContainerError::NotFound(message.to_string()),
        Some((409, message)) => ContainerError::AlreadyExists(message.to_string()),
        _ => ContainerError::Engine(e.to_string()),
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container engine implementation using bollard.
pub struct BollardRuntime {
    client: Docker,
    endpoint: String,
}

impl BollardRuntime {
    pub fn new(client: Docker, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Connect to the engine on `socket`, or via `DOCKER_HOST` / the default
    /// local socket when none is given.
    pub fn connect(socket: Option<&str>) -> Result<Self, RuntimeError> {
        match socket {
            Some(path) => {
                let client =
                    Docker::connect_with_unix(path, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
                        .context(ConnectSnafu { endpoint: path })?;
                Ok(Self::new(client, path))
            }
            None => {
                let client = Docker::connect_with_local_defaults().context(ConnectSnafu {
                    endpoint: "local defaults",
                })?;
                Ok(Self::new(client, "local defaults"))
            }
        }
    }

    /// Check that the engine answers.
    pub async fn ping(&self) -> Result<(), RuntimeError> {
        self.client.ping().await.context(PingSnafu {
            endpoint: self.endpoint.clone(),
        })?;
        Ok(())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn restart_policy(policy: &RestartPolicyConfig) -> RestartPolicy {
    let (name, maximum_retry_count) = match policy {
        RestartPolicyConfig::No => (RestartPolicyNameEnum::NO, None),
        RestartPolicyConfig::Always => (RestartPolicyNameEnum::ALWAYS, None),
        RestartPolicyConfig::UnlessStopped => (RestartPolicyNameEnum::UNLESS_STOPPED, None),
        RestartPolicyConfig::OnFailure { max_retries } => (
            RestartPolicyNameEnum::ON_FAILURE,
            max_retries.map(i64::from),
        ),
    };
    RestartPolicy {
        name: Some(name),
        maximum_retry_count,
    }
}

fn host_config(config: &ContainerConfig) -> HostConfig {
    let mut host_config = HostConfig {
        restart_policy: Some(restart_policy(&config.restart_policy)),
        memory: config.resources.memory.map(|m| m as i64),
        cpu_shares: config.resources.cpu_shares.map(i64::from),
        nano_cpus: config
            .resources
            .cpus
            .map(|cpus| (cpus * 1_000_000_000.0) as i64),
        readonly_rootfs: config.read_only.then_some(true),
        network_mode: config.network.clone(),
        ..Default::default()
    };

    let mounts: Vec<Mount> = config
        .volumes
        .iter()
        .map(|m| Mount {
            source: Some(m.source.clone()),
            target: Some(m.target.clone()),
            typ: Some(if m.is_named_volume() {
                MountTypeEnum::VOLUME
            } else {
                MountTypeEnum::BIND
            }),
            read_only: Some(m.read_only),
            ..Default::default()
        })
        .collect();
    if !mounts.is_empty() {
        host_config.mounts = Some(mounts);
    }

    let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
    for port in &config.ports {
        if let Some(host_port) = port.host_port {
            port_bindings
                .entry(format!("{}/{}", port.container_port, port.protocol.as_str()))
                .or_insert_with(|| Some(Vec::new()))
                .get_or_insert_with(Vec::new)
                .push(PortBinding {
                    host_ip: port.host_ip.clone(),
                    host_port: Some(host_port.to_string()),
                });
        }
    }
    if !port_bindings.is_empty() {
        host_config.port_bindings = Some(port_bindings);
    }

    host_config
}

fn networking_config(config: &ContainerConfig) -> Option<NetworkingConfig> {
    let network = config.network.as_ref()?;
    let aliases: Vec<String> = config
        .network_aliases
        .iter()
        .map(|a| a.to_string())
        .collect();
    let mut endpoints = HashMap::new();
    endpoints.insert(
        network.clone(),
        EndpointSettings {
            aliases: (!aliases.is_empty()).then_some(aliases),
            ..Default::default()
        },
    );
    Some(NetworkingConfig {
        endpoints_config: Some(endpoints),
    })
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image_name = reference.to_string();
        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        // The pull only completes once its progress stream is drained.
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(progress) = stream.next().await {
            let progress =
                progress.map_err(|e| ImageError::PullFailed(format!("{}: {}", image_name, e)))?;
            if let Some(detail) = progress.error_detail.and_then(|d| d.message) {
                return Err(ImageError::PullFailed(format!("{}: {}", image_name, detail)));
            }
        }

        Ok(())
    }

    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(id.as_str(), Some(opts), None)
            .await
            .map_err(|e| map_image_remove_error(e, id))?;

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let env: Vec<String> = config
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let exposed_ports: Vec<String> = config
            .ports
            .iter()
            .map(|p| format!("{}/{}", p.container_port, p.protocol.as_str()))
            .collect();

        let healthcheck = config.healthcheck.as_ref().map(|hc| HealthConfig {
            test: Some(hc.test.clone()),
            interval: hc.interval.map(|d| d.as_nanos() as i64),
            timeout: hc.timeout.map(|d| d.as_nanos() as i64),
            retries: hc.retries.map(i64::from),
            start_period: hc.start_period.map(|d| d.as_nanos() as i64),
            ..Default::default()
        });

        let body = ContainerCreateBody {
            image: Some(config.image.to_string()),
            env: (!env.is_empty()).then_some(env),
            labels: (!config.labels.is_empty()).then(|| config.labels.clone()),
            cmd: config.command.clone(),
            entrypoint: config.entrypoint.clone(),
            user: config.user.clone(),
            host_config: Some(host_config(config)),
            healthcheck,
            exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
            networking_config: networking_config(config),
            stop_timeout: config.stop_timeout.map(|d| d.as_secs() as i64),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(config.name.clone()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(map_container_create_error)?;

        for warning in &response.warnings {
            tracing::warn!(container = %config.name, "engine warning: {}", warning);
        }

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(map_container_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            v: true,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(|s| match s {
                bollard::models::ContainerStateStatusEnum::CREATED => ContainerState::Created,
                bollard::models::ContainerStateStatusEnum::RUNNING => ContainerState::Running,
                bollard::models::ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
                bollard::models::ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
                bollard::models::ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
                bollard::models::ContainerStateStatusEnum::DEAD => ContainerState::Dead,
                _ => ContainerState::Exited,
            })
            .unwrap_or(ContainerState::Exited);

        let health_details = details.state.as_ref().and_then(|s| s.health.as_ref());
        let health = health_details.and_then(|h| h.status).map(|s| match s {
            bollard::models::HealthStatusEnum::STARTING => HealthState::Starting,
            bollard::models::HealthStatusEnum::HEALTHY => HealthState::Healthy,
            bollard::models::HealthStatusEnum::UNHEALTHY => HealthState::Unhealthy,
            _ => HealthState::None,
        });
        let health_log = health_details
            .and_then(|h| h.log.as_ref())
            .map(|log| {
                log.iter()
                    .filter_map(|result| result.output.as_deref())
                    .map(|output| output.trim_end().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let has_healthcheck = details
            .config
            .as_ref()
            .and_then(|c| c.healthcheck.as_ref())
            .and_then(|h| h.test.as_ref())
            .and_then(|test| test.first())
            .is_some_and(|kind| kind != "NONE");

        Ok(ContainerInfo {
            id: id.clone(),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: details
                .config
                .as_ref()
                .and_then(|c| c.image.clone())
                .unwrap_or_default(),
            image_id: details.image.map(ImageId::new),
            state,
            health,
            health_log,
            has_healthcheck,
            labels: details.config.and_then(|c| c.labels).unwrap_or_default(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();

        if let Some(ref name) = filters.name {
            filter_map.insert("name".to_string(), vec![name.clone()]);
        }

        for (key, value) in &filters.labels {
            filter_map
                .entry("label".to_string())
                .or_default()
                .push(format!("{}={}", key, value));
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(|e| ContainerError::Engine(e.to_string()))?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: ContainerId::new(c.id.unwrap_or_default()),
                name: c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c
                    .state
                    .map(|s| format!("{:?}", s).to_lowercase())
                    .unwrap_or_default(),
                labels: c.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn rename_container(
        &self,
        id: &ContainerId,
        new_name: &str,
    ) -> Result<(), ContainerError> {
        self.client
            .rename_container(
                id.as_str(),
                RenameContainerOptions {
                    name: new_name.to_string(),
                },
            )
            .await
            .map_err(map_container_rename_error)
    }
}

#[async_trait]
impl EventOps for BollardRuntime {
    async fn subscribe_events(&self, filters: &EventFilters) -> Result<EventStream, EventError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();
        filter_map.insert("type".to_string(), vec!["container".to_string()]);
        if !filters.containers.is_empty() {
            filter_map.insert(
                "container".to_string(),
                filters.containers.iter().map(|c| c.to_string()).collect(),
            );
        }
        if !filters.actions.is_empty() {
            filter_map.insert("event".to_string(), filters.actions.clone());
        }

        let opts = EventsOptions {
            filters: Some(filter_map),
            ..Default::default()
        };

        // Messages without an actor or action are dropped rather than surfaced.
        let stream = self
            .client
            .events(Some(opts))
            .filter_map(|message| async move {
                match message {
                    Ok(message) => {
                        let container = message.actor.and_then(|a| a.id)?;
                        let action = message.action?;
                        Some(Ok(EngineEvent {
                            container: ContainerId::new(container),
                            action,
                        }))
                    }
                    Err(e) => Some(Err(EventError::Stream(e.to_string()))),
                }
            });

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl LogOps for BollardRuntime {
    async fn container_logs(
        &self,
        id: &ContainerId,
        tail: usize,
    ) -> Result<Vec<String>, LogError> {
        let opts = LogsOptions {
            stdout: true,
            stderr: true,
            follow: false,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut stream = self.client.logs(id.as_str(), Some(opts));
        let mut lines = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| match server_status(&e) {
                Some((404, message)) => LogError::ContainerNotFound(message.to_string()),
                _ => LogError::StreamError(e.to_string()),
            })?;
            let text = String::from_utf8_lossy(&chunk.into_bytes()).into_owned();
            lines.extend(text.lines().map(str::to_string));
        }

        Ok(lines)
    }
}
