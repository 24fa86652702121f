// ABOUTME: Compose restart policy parsing.
// ABOUTME: Supports no, always, unless-stopped, and on-failure[:max-retries].

use crate::runtime::RestartPolicyConfig;
use serde::de::{self, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartPolicy {
    No,
    Always,
    UnlessStopped,
    OnFailure { max_retries: Option<u32> },
}

impl FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(RestartPolicy::No),
            "always" => Ok(RestartPolicy::Always),
            "unless-stopped" => Ok(RestartPolicy::UnlessStopped),
            "on-failure" => Ok(RestartPolicy::OnFailure { max_retries: None }),
            s if s.starts_with("on-failure:") => {
                let retries_str = &s["on-failure:".len()..];
                let retries = retries_str
                    .parse::<u32>()
                    .map_err(|_| format!("invalid max retries: {}", retries_str))?;
                Ok(RestartPolicy::OnFailure {
                    max_retries: Some(retries),
                })
            }
            _ => Err(format!("unknown restart policy: {}", s)),
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPolicy::No => write!(f, "no"),
            RestartPolicy::Always => write!(f, "always"),
            RestartPolicy::UnlessStopped => write!(f, "unless-stopped"),
            RestartPolicy::OnFailure { max_retries: None } => write!(f, "on-failure"),
            RestartPolicy::OnFailure {
                max_retries: Some(n),
            } => write!(f, "on-failure:{}", n),
        }
    }
}

impl From<&RestartPolicy> for RestartPolicyConfig {
    fn from(policy: &RestartPolicy) -> Self {
        match policy {
            RestartPolicy::No => RestartPolicyConfig::No,
            RestartPolicy::Always => RestartPolicyConfig::Always,
            RestartPolicy::UnlessStopped => RestartPolicyConfig::UnlessStopped,
            RestartPolicy::OnFailure { max_retries } => RestartPolicyConfig::OnFailure {
                max_retries: *max_retries,
            },
        }
    }
}

impl<'de> Deserialize<'de> for RestartPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_on_failure_with_retries() {
        assert_eq!(
            "on-failure:3".parse::<RestartPolicy>().unwrap(),
            RestartPolicy::OnFailure {
                max_retries: Some(3)
            }
        );
    }

    #[test]
    fn rejects_bad_retry_count() {
        assert!("on-failure:many".parse::<RestartPolicy>().is_err());
        assert!("sometimes".parse::<RestartPolicy>().is_err());
    }

    #[test]
    fn display_matches_compose_syntax() {
        for s in ["no", "always", "unless-stopped", "on-failure", "on-failure:2"] {
            assert_eq!(s.parse::<RestartPolicy>().unwrap().to_string(), s);
        }
    }
}
