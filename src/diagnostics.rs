// ABOUTME: Diagnostics accumulator for non-fatal warnings during deployment.
// ABOUTME: Per-service cleanup failures are logged and kept for the outcome summary.

use serde::Serialize;

/// Collects non-fatal warnings during deployment operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        match &warning.service {
            Some(service) => tracing::warn!(service = %service, "{}", warning.message),
            None => tracing::warn!("{}", warning.message),
        }
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    /// Service the warning concerns, when there is one.
    pub service: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, service: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            service: service.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn stop_failed(service: &str, message: impl Into<String>) -> Self {
        Self::new(WarningKind::StopFailed, Some(service), message)
    }

    pub fn remove_failed(service: &str, message: impl Into<String>) -> Self {
        Self::new(WarningKind::RemoveFailed, Some(service), message)
    }

    pub fn rename_failed(service: &str, message: impl Into<String>) -> Self {
        Self::new(WarningKind::RenameFailed, Some(service), message)
    }

    pub fn inspect_failed(service: &str, message: impl Into<String>) -> Self {
        Self::new(WarningKind::InspectFailed, Some(service), message)
    }

    pub fn logs_unavailable(service: &str, message: impl Into<String>) -> Self {
        Self::new(WarningKind::LogsUnavailable, Some(service), message)
    }

    pub fn orphan_cleanup(container: &str, message: impl Into<String>) -> Self {
        Self::new(WarningKind::OrphanCleanup, Some(container), message)
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A container did not stop cleanly.
    StopFailed,
    /// A container could not be removed.
    RemoveFailed,
    /// A new container kept its temporary name.
    RenameFailed,
    /// A container could not be inspected.
    InspectFailed,
    /// Container output could not be captured.
    LogsUnavailable,
    /// A leftover container from an interrupted run could not be removed.
    OrphanCleanup,
}
