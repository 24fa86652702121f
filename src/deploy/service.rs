// ABOUTME: A service created by the current deployment and its verification state.
// ABOUTME: Also owns the temporary and final container naming convention.

use serde::Serialize;

use crate::types::{AppName, ContainerId, ImageRef, ServiceName};

/// Suffix carried by containers until the deployment commits.
pub const DEPLOY_SUFFIX: &str = "_deploy";

/// Temporary container name for a service: `app_service_deploy`.
pub fn deploy_name(app: &AppName, service: &ServiceName) -> String {
    format!("{}_{}{}", app, service, DEPLOY_SUFFIX)
}

/// Stable name of a container, without the temporary suffix.
pub fn final_name(full_name: &str) -> &str {
    full_name.strip_suffix(DEPLOY_SUFFIX).unwrap_or(full_name)
}

/// Whether a container name still carries the temporary suffix.
pub fn is_deploy_name(name: &str) -> bool {
    name.ends_with(DEPLOY_SUFFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    Pending,
    Healthy,
    Unhealthy,
}

/// A container created by this deployment.
///
/// The container id is fixed at creation; only the state and the captured
/// logs change afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct DeployedService {
    pub name: ServiceName,
    pub full_name: String,
    pub container_id: ContainerId,
    pub image: ImageRef,
    pub state: VerificationState,
    pub logs: Vec<String>,
    pub health_logs: Vec<String>,
}

impl DeployedService {
    pub fn new(
        app: &AppName,
        name: ServiceName,
        container_id: ContainerId,
        image: ImageRef,
    ) -> Self {
        Self {
            full_name: deploy_name(app, &name),
            name,
            container_id,
            image,
            state: VerificationState::Pending,
            logs: Vec::new(),
            health_logs: Vec::new(),
        }
    }

    pub fn final_name(&self) -> &str {
        final_name(&self.full_name)
    }
}

/// What the caller gets back before verification starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub name: ServiceName,
    pub full_name: String,
    pub container_id: ContainerId,
    pub image: String,
}

impl From<&DeployedService> for ServiceSummary {
    fn from(service: &DeployedService) -> Self {
        Self {
            name: service.name.clone(),
            full_name: service.full_name.clone(),
            container_id: service.container_id.clone(),
            image: service.image.to_string(),
        }
    }
}
