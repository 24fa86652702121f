// ABOUTME: Compose healthcheck block.
// ABOUTME: Converts test strings and lists into the engine's health check form.

use crate::runtime::HealthcheckConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HealthcheckTest {
    /// Run through the container's shell.
    Shell(String),
    /// `["CMD", ...]`, `["CMD-SHELL", "..."]` or `["NONE"]`.
    Exec(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Healthcheck {
    #[serde(default)]
    pub test: Option<HealthcheckTest>,

    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub retries: Option<u32>,

    #[serde(default, with = "humantime_serde")]
    pub start_period: Option<Duration>,

    #[serde(default)]
    pub disable: bool,
}

impl Healthcheck {
    /// Engine form. A missing test inherits the image's own check.
    pub fn to_engine_config(&self) -> HealthcheckConfig {
        if self.disable {
            return HealthcheckConfig {
                test: vec!["NONE".to_string()],
                interval: None,
                timeout: None,
                retries: None,
                start_period: None,
            };
        }

        let test = match &self.test {
            Some(HealthcheckTest::Shell(cmd)) => vec!["CMD-SHELL".to_string(), cmd.clone()],
            Some(HealthcheckTest::Exec(args)) => args.clone(),
            None => Vec::new(),
        };

        HealthcheckConfig {
            test,
            interval: self.interval,
            timeout: self.timeout,
            retries: self.retries,
            start_period: self.start_period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_string_becomes_cmd_shell() {
        let hc: Healthcheck =
            serde_yaml::from_str("test: curl -f http://localhost/\ninterval: 5s").unwrap();
        let config = hc.to_engine_config();
        assert_eq!(config.test, vec!["CMD-SHELL", "curl -f http://localhost/"]);
        assert_eq!(config.interval, Some(Duration::from_secs(5)));
    }

    #[test]
    fn exec_list_is_kept() {
        let hc: Healthcheck = serde_yaml::from_str(r#"test: ["CMD", "true"]"#).unwrap();
        assert_eq!(hc.to_engine_config().test, vec!["CMD", "true"]);
    }

    #[test]
    fn disable_overrides_test() {
        let hc: Healthcheck =
            serde_yaml::from_str("test: [\"CMD\", \"true\"]\ndisable: true").unwrap();
        assert_eq!(hc.to_engine_config().test, vec!["NONE"]);
    }
}
