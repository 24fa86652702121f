// ABOUTME: Delivery of deployment outcomes to people and alerting systems.
// ABOUTME: Notifier trait with tracing-based and hook-script implementations.

mod hook;

pub use hook::{HookNotifier, HookPoint};

use async_trait::async_trait;

use crate::deploy::DeploymentOutcome;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("cannot run {hook}: {source}")]
    Spawn {
        hook: String,
        source: std::io::Error,
    },

    #[error("{hook} exited with code {code:?}: {stderr}")]
    HookFailed {
        hook: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("cannot encode outcome: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Receives the outcome of every finished deployment.
///
/// Errors are logged by the caller and never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, outcome: &DeploymentOutcome) -> Result<(), NotifyError>;
}

/// Writes the outcome to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, outcome: &DeploymentOutcome) -> Result<(), NotifyError> {
        if outcome.success {
            tracing::info!(app = %outcome.app, user = %outcome.user, "{}", outcome.headline());
        } else {
            tracing::error!(app = %outcome.app, user = %outcome.user, "{}", outcome.headline());
        }
        for service in &outcome.services {
            tracing::debug!(
                app = %outcome.app,
                service = %service.name,
                state = ?service.state,
                "service summary"
            );
        }
        Ok(())
    }
}
