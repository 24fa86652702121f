// ABOUTME: Runs user scripts when a deployment finishes.
// ABOUTME: on-success / on-failure receive SWAPDOCK_* variables and the JSON outcome.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{Notifier, NotifyError};
use crate::deploy::DeploymentOutcome;

/// Which script runs for an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    OnSuccess,
    OnFailure,
}

impl HookPoint {
    pub fn for_outcome(success: bool) -> Self {
        if success {
            HookPoint::OnSuccess
        } else {
            HookPoint::OnFailure
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::OnSuccess => "on-success",
            HookPoint::OnFailure => "on-failure",
        }
    }
}

/// Environment passed to hook scripts.
pub fn hook_env(outcome: &DeploymentOutcome) -> Result<HashMap<String, String>, NotifyError> {
    let mut env = HashMap::new();
    env.insert("SWAPDOCK_APP".to_string(), outcome.app.to_string());
    env.insert("SWAPDOCK_USER".to_string(), outcome.user.clone());
    env.insert("SWAPDOCK_SUCCESS".to_string(), outcome.success.to_string());
    env.insert("SWAPDOCK_HOST".to_string(), outcome.host.clone());
    env.insert(
        "SWAPDOCK_SERVICES".to_string(),
        outcome
            .services
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );
    if let Some(ref url) = outcome.app_url {
        env.insert("SWAPDOCK_APP_URL".to_string(), url.clone());
    }
    env.insert(
        "SWAPDOCK_OUTCOME".to_string(),
        serde_json::to_string(outcome)?,
    );
    Ok(env)
}

/// Runs `<hooks_dir>/on-success` or `<hooks_dir>/on-failure` when present.
#[derive(Debug, Clone)]
pub struct HookNotifier {
    hooks_dir: PathBuf,
}

impl HookNotifier {
    pub fn new(hooks_dir: impl AsRef<Path>) -> Self {
        Self {
            hooks_dir: hooks_dir.as_ref().to_path_buf(),
        }
    }

    pub fn hook_exists(&self, point: HookPoint) -> bool {
        self.hook_path(point).is_file()
    }

    fn hook_path(&self, point: HookPoint) -> PathBuf {
        self.hooks_dir.join(point.filename())
    }
}

#[async_trait]
impl Notifier for HookNotifier {
    async fn notify(&self, outcome: &DeploymentOutcome) -> Result<(), NotifyError> {
        let point = HookPoint::for_outcome(outcome.success);
        let hook_path = self.hook_path(point);

        if !hook_path.is_file() {
            tracing::debug!(hook = %hook_path.display(), "no hook installed");
            return Ok(());
        }

        tracing::info!(app = %outcome.app, "running {} hook", point.filename());

        let output = Command::new(&hook_path)
            .envs(hook_env(outcome)?)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| NotifyError::Spawn {
                hook: point.filename().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(NotifyError::HookFailed {
                hook: point.filename().to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!(
            app = %outcome.app,
            "{} hook output: {}",
            point.filename(),
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }
}
