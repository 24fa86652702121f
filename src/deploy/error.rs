// ABOUTME: Error types for deployment operations with SNAFU context.
// ABOUTME: Every engine failure carries the application and service it concerned.

use snafu::Snafu;

use crate::auth::AuthError;
use crate::manifest::ManifestError;
use crate::runtime::{ContainerError, ImageError};
use crate::types::{AppName, ServiceName};

/// Errors reported by a deployment.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeployError {
    #[snafu(display("app={app}: no identity attached to the request"))]
    MissingIdentity { app: AppName },

    #[snafu(display("app={app}: {source}"))]
    Authorize { app: AppName, source: AuthError },

    #[snafu(display("app={app}: invalid manifest: {source}"))]
    Manifest { app: AppName, source: ManifestError },

    #[snafu(display("app={app}: a deployment is already in progress"))]
    Busy { app: AppName },

    #[snafu(display("app={app} service={service}: cannot pull {image}: {source}"))]
    Pull {
        app: AppName,
        service: ServiceName,
        image: String,
        source: ImageError,
    },

    #[snafu(display("app={app} service={service}: cannot create container: {source}"))]
    Create {
        app: AppName,
        service: ServiceName,
        source: ContainerError,
    },

    #[snafu(display("app={app} service={service}: cannot start container: {source}"))]
    Start {
        app: AppName,
        service: ServiceName,
        source: ContainerError,
    },

    #[snafu(display("app={app}: health verification failed: {reason}"))]
    Health { app: AppName, reason: String },

    #[snafu(display("app={app}: cannot remove previous container {container}: {source}"))]
    RemoveOld {
        app: AppName,
        container: String,
        source: ContainerError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Rejected before any engine mutation.
    Validation,
    /// Another deployment of the same application is in flight.
    Conflict,
    /// The container engine refused an operation.
    Engine,
    /// New containers never became healthy.
    Health,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::MissingIdentity { .. } | DeployError::Manifest { .. } => {
                DeployErrorKind::Validation
            }
            DeployError::Authorize { source, .. } => match source {
                AuthError::Unauthorized { .. } => DeployErrorKind::Validation,
                AuthError::Engine { .. } => DeployErrorKind::Engine,
            },
            DeployError::Busy { .. } => DeployErrorKind::Conflict,
            DeployError::Pull { .. }
            | DeployError::Create { .. }
            | DeployError::Start { .. }
            | DeployError::RemoveOld { .. } => DeployErrorKind::Engine,
            DeployError::Health { .. } => DeployErrorKind::Health,
        }
    }

    /// The application the error concerns.
    pub fn app(&self) -> &AppName {
        match self {
            DeployError::MissingIdentity { app }
            | DeployError::Authorize { app, .. }
            | DeployError::Manifest { app, .. }
            | DeployError::Busy { app }
            | DeployError::Pull { app, .. }
            | DeployError::Create { app, .. }
            | DeployError::Start { app, .. }
            | DeployError::Health { app, .. }
            | DeployError::RemoveOld { app, .. } => app,
        }
    }
}
