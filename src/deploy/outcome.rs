// ABOUTME: Final summary of a deployment handed to notifiers.
// ABOUTME: Serializable so hooks and alerting receive it as JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::service::DeployedService;
use crate::diagnostics::Warning;
use crate::types::AppName;

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutcome {
    pub app: AppName,
    pub user: String,
    pub success: bool,
    pub services: Vec<DeployedService>,
    /// Parameters the request was made with.
    pub params: BTreeMap<String, String>,
    pub warnings: Vec<Warning>,
    pub app_url: Option<String>,
    pub host: String,
    pub finished_at: DateTime<Utc>,
}

impl DeploymentOutcome {
    /// One-line description, e.g. for a mail subject.
    pub fn headline(&self) -> String {
        let verdict = if self.success { "succeeded" } else { "failed" };
        format!("deployment of {} by {} {}", self.app, self.user, verdict)
    }
}

pub(crate) fn hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headline_reports_verdict() {
        let outcome = DeploymentOutcome {
            app: AppName::new("shop").unwrap(),
            user: "alice".to_string(),
            success: false,
            services: Vec::new(),
            params: BTreeMap::new(),
            warnings: Vec::new(),
            app_url: None,
            host: hostname(),
            finished_at: Utc::now(),
        };
        assert_eq!(outcome.headline(), "deployment of shop by alice failed");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["app"], "shop");
        assert_eq!(json["success"], false);
    }
}
