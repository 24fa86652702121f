// ABOUTME: Identity of the requester and the authorization check for an application.
// ABOUTME: LabelAuthorizer grants access from the owner label of existing containers.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::runtime::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary, OWNER_LABEL};
use crate::types::AppName;

/// Role that may deploy any application.
pub const ADMIN_ROLE: &str = "admin";

/// Who asked for a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub username: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user {user} is not allowed to deploy {app}")]
    Unauthorized { user: String, app: AppName },

    #[error("cannot list containers: {source}")]
    Engine { source: ContainerError },
}

/// Decides whether an identity may deploy an application.
///
/// On success returns the application's containers as they are right now;
/// they become the previous deployment.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(
        &self,
        identity: &Identity,
        app: &AppName,
    ) -> Result<Vec<ContainerSummary>, AuthError>;
}

/// Grants access when every existing container is owned by the requester.
pub struct LabelAuthorizer<E: ?Sized> {
    engine: Arc<E>,
}

impl<E: ContainerOps + ?Sized> LabelAuthorizer<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<E: ContainerOps + ?Sized> Authorizer for LabelAuthorizer<E> {
    async fn authorize(
        &self,
        identity: &Identity,
        app: &AppName,
    ) -> Result<Vec<ContainerSummary>, AuthError> {
        let containers = self
            .engine
            .list_containers(&ContainerFilters::for_app(app))
            .await
            .map_err(|source| AuthError::Engine { source })?;

        if identity.has_role(ADMIN_ROLE) {
            return Ok(containers);
        }

        let foreign = containers
            .iter()
            .find(|c| c.label(OWNER_LABEL) != Some(identity.username.as_str()));
        if let Some(container) = foreign {
            tracing::debug!(
                user = %identity.username,
                app = %app,
                container = %container.name,
                "container owned by someone else"
            );
            return Err(AuthError::Unauthorized {
                user: identity.username.clone(),
                app: app.clone(),
            });
        }

        Ok(containers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_is_detected() {
        let admin = Identity::new("root").with_role(ADMIN_ROLE);
        assert!(admin.has_role("admin"));
        assert!(!Identity::new("alice").has_role("admin"));
    }
}
