// ABOUTME: In-memory container engine implementing every runtime capability.
// ABOUTME: Records calls, injects failures, and scripts health events per container name.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use swapdock::deploy::DeploymentOutcome;
use swapdock::notify::{Notifier, NotifyError};
use swapdock::runtime::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerState, ContainerSummary, EngineEvent, EventError, EventFilters, EventOps,
    EventStream, HEALTHY_ACTION, ImageError, ImageOps, LogError, LogOps,
};
use swapdock::types::{ContainerId, ImageId, ImageRef};

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub labels: HashMap<String, String>,
    pub has_healthcheck: bool,
}

#[derive(Default)]
struct State {
    containers: BTreeMap<String, FakeContainer>,
    next_id: usize,
    calls: Vec<String>,
    failures: HashSet<String>,
    healthy: HashSet<String>,
    close_stream: bool,
}

/// Engine double. Containers are keyed by id; names are unique.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<State>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a running container as if left by an earlier deployment.
    pub fn seed(&self, name: &str, labels: &[(&str, &str)]) {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = ContainerId::new(format!("seed{:04}", state.next_id));
        state.containers.insert(
            id.to_string(),
            FakeContainer {
                id: id.clone(),
                name: name.to_string(),
                image: "old:1".to_string(),
                state: ContainerState::Running,
                labels: labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                has_healthcheck: false,
            },
        );
    }

    /// Make an operation fail, e.g. `"pull:app:1.0"`, `"start:shop_web_deploy"`.
    pub fn fail(&self, key: &str) {
        self.state.lock().failures.insert(key.to_string());
    }

    /// Emit a healthy event for the container with this name once subscribed.
    pub fn report_healthy(&self, name: &str) {
        self.state.lock().healthy.insert(name.to_string());
    }

    /// End the event stream after the scripted events.
    pub fn close_event_stream(&self) {
        self.state.lock().close_stream = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.state.lock().calls.iter().any(|c| c == call)
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.state.lock().calls.iter().position(|c| c == call)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .containers
            .values()
            .map(|c| c.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.state
            .lock()
            .containers
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }

    fn should_fail(&self, key: &str) -> bool {
        self.state.lock().failures.contains(key)
    }

    fn name_of(&self, id: &ContainerId) -> Option<String> {
        self.state
            .lock()
            .containers
            .get(id.as_str())
            .map(|c| c.name.clone())
    }
}

#[async_trait]
impl ImageOps for FakeEngine {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        self.record(format!("pull {}", reference));
        if self.should_fail(&format!("pull:{}", reference)) {
            return Err(ImageError::PullFailed(reference.to_string()));
        }
        Ok(())
    }

    async fn remove_image(&self, id: &ImageId, _force: bool) -> Result<(), ImageError> {
        self.record(format!("remove_image {}", id));
        Err(ImageError::InUse(id.to_string()))
    }
}

#[async_trait]
impl ContainerOps for FakeEngine {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        self.record(format!("create {} {}", config.name, config.image));
        if self.should_fail(&format!("create:{}", config.name)) {
            return Err(ContainerError::InvalidConfig(config.name.clone()));
        }

        let mut state = self.state.lock();
        if state.containers.values().any(|c| c.name == config.name) {
            return Err(ContainerError::AlreadyExists(config.name.clone()));
        }
        state.next_id += 1;
        let id = ContainerId::new(format!("new{:04}", state.next_id));
        let has_healthcheck = config
            .healthcheck
            .as_ref()
            .is_some_and(|hc| hc.test.first().map(String::as_str) != Some("NONE"));
        state.containers.insert(
            id.to_string(),
            FakeContainer {
                id: id.clone(),
                name: config.name.clone(),
                image: config.image.to_string(),
                state: ContainerState::Created,
                labels: config.labels.clone(),
                has_healthcheck,
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let name = self
            .name_of(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        self.record(format!("start {}", name));
        if self.should_fail(&format!("start:{}", name)) {
            return Err(ContainerError::Engine(format!("cannot start {}", name)));
        }
        if let Some(c) = self.state.lock().containers.get_mut(id.as_str()) {
            c.state = ContainerState::Running;
        }
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        let name = self
            .name_of(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        self.record(format!("stop {}", name));
        if self.should_fail(&format!("stop:{}", name)) {
            return Err(ContainerError::Engine(format!("cannot stop {}", name)));
        }
        if let Some(c) = self.state.lock().containers.get_mut(id.as_str()) {
            c.state = ContainerState::Exited;
        }
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        let name = self
            .name_of(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        self.record(format!("remove {}", name));
        if self.should_fail(&format!("remove:{}", name)) {
            return Err(ContainerError::Engine(format!("cannot remove {}", name)));
        }
        self.state.lock().containers.remove(id.as_str());
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let container = self
            .state
            .lock()
            .containers
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if self.should_fail(&format!("inspect:{}", container.name)) {
            return Err(ContainerError::Engine(format!("cannot inspect {}", container.name)));
        }
        Ok(ContainerInfo {
            id: container.id.clone(),
            name: container.name.clone(),
            image: container.image.clone(),
            image_id: Some(ImageId::new(format!("sha256:{}", container.image))),
            state: container.state,
            health: None,
            health_log: vec![format!("{}: check output", container.name)],
            has_healthcheck: container.has_healthcheck,
            labels: container.labels.clone(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        self.record("list".to_string());
        if self.should_fail("list") {
            return Err(ContainerError::Engine("cannot list".to_string()));
        }
        Ok(self
            .state
            .lock()
            .containers
            .values()
            .filter(|c| {
                filters
                    .labels
                    .iter()
                    .all(|(k, v)| c.labels.get(k) == Some(v))
            })
            .filter(|c| filters.name.as_ref().is_none_or(|n| c.name.contains(n)))
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                state: format!("{:?}", c.state).to_lowercase(),
                labels: c.labels.clone(),
            })
            .collect())
    }

    async fn rename_container(&self, id: &ContainerId, new_name: &str) -> Result<(), ContainerError> {
        let name = self
            .name_of(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        self.record(format!("rename {} {}", name, new_name));
        if self.should_fail(&format!("rename:{}", name)) {
            return Err(ContainerError::Engine(format!("cannot rename {}", name)));
        }
        let mut state = self.state.lock();
        if state.containers.values().any(|c| c.name == new_name) {
            return Err(ContainerError::AlreadyExists(new_name.to_string()));
        }
        if let Some(c) = state.containers.get_mut(id.as_str()) {
            c.name = new_name.to_string();
        }
        Ok(())
    }
}

#[async_trait]
impl EventOps for FakeEngine {
    async fn subscribe_events(&self, filters: &EventFilters) -> Result<EventStream, EventError> {
        self.record("subscribe".to_string());
        if self.should_fail("subscribe") {
            return Err(EventError::Subscribe("engine unavailable".to_string()));
        }

        let state = self.state.lock();
        let events: Vec<Result<EngineEvent, EventError>> = filters
            .containers
            .iter()
            .filter_map(|id| state.containers.get(id.as_str()))
            .filter(|c| state.healthy.contains(&c.name))
            .map(|c| {
                Ok(EngineEvent {
                    container: c.id.clone(),
                    action: HEALTHY_ACTION.to_string(),
                })
            })
            .collect();

        if state.close_stream {
            Ok(stream::iter(events).boxed())
        } else {
            Ok(stream::iter(events).chain(stream::pending()).boxed())
        }
    }
}

#[async_trait]
impl LogOps for FakeEngine {
    async fn container_logs(&self, id: &ContainerId, tail: usize) -> Result<Vec<String>, LogError> {
        let name = self
            .name_of(id)
            .ok_or_else(|| LogError::ContainerNotFound(id.to_string()))?;
        Ok((1..=3.min(tail)).map(|i| format!("{} line {}", name, i)).collect())
    }
}

/// Keeps every outcome it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    outcomes: Mutex<Vec<DeploymentOutcome>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::default(),
            fail: true,
        })
    }

    pub fn outcomes(&self) -> Vec<DeploymentOutcome> {
        self.outcomes.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, outcome: &DeploymentOutcome) -> Result<(), NotifyError> {
        self.outcomes.lock().push(outcome.clone());
        if self.fail {
            return Err(NotifyError::HookFailed {
                hook: "recording".to_string(),
                code: Some(1),
                stderr: "refused".to_string(),
            });
        }
        Ok(())
    }
}
