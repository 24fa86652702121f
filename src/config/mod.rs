// ABOUTME: Orchestrator settings loaded from swapdock.yml.
// ABOUTME: Handles file discovery, defaults, and SWAPDOCK_* environment overrides.

mod notification;

pub use notification::NotificationPolicy;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "swapdock.yml";
pub const CONFIG_FILENAME_ALT: &str = "swapdock.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".swapdock/config.yml";

const ENV_PREFIX: &str = "SWAPDOCK_";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Network every new container joins.
    pub network: String,

    /// Tag tried before the image's own reference. Empty disables it.
    pub tag: String,

    /// User containers run as unless the manifest sets one.
    pub container_user: String,

    /// Link included in notifications.
    pub app_url: Option<String>,

    pub notification: NotificationPolicy,

    #[serde(with = "humantime_serde")]
    pub health_timeout: Duration,

    /// Grace period given to old containers when they are stopped.
    #[serde(with = "humantime_serde")]
    pub stop_timeout: Duration,

    pub docker_socket: Option<String>,

    pub hooks_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network: "traefik".to_string(),
            tag: "latest".to_string(),
            container_user: "1000".to_string(),
            app_url: None,
            notification: NotificationPolicy::default(),
            health_timeout: Duration::from_secs(180),
            stop_timeout: Duration::from_secs(60),
            docker_socket: None,
            hooks_dir: PathBuf::from(".swapdock/hooks"),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the first settings file found in `dir`, or the defaults.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading settings");
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Apply `SWAPDOCK_*` environment variables on top of the loaded values.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(network) = lookup("NETWORK") {
            self.network = network;
        }
        if let Some(tag) = lookup("TAG") {
            self.tag = tag;
        }
        if let Some(user) = lookup("CONTAINER_USER") {
            self.container_user = user;
        }
        if let Some(url) = lookup("APP_URL") {
            self.app_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(policy) = lookup("NOTIFICATION") {
            self.notification = policy.parse().map_err(Error::InvalidConfig)?;
        }
        if let Some(timeout) = lookup("HEALTH_TIMEOUT") {
            self.health_timeout = parse_duration("HEALTH_TIMEOUT", &timeout)?;
        }
        if let Some(timeout) = lookup("STOP_TIMEOUT") {
            self.stop_timeout = parse_duration("STOP_TIMEOUT", &timeout)?;
        }
        if let Some(socket) = lookup("DOCKER_SOCKET") {
            self.docker_socket = Some(socket).filter(|s| !s.is_empty());
        }
        Ok(self)
    }

    /// The fallback tag, if one is configured.
    pub fn fallback_tag(&self) -> Option<&str> {
        Some(self.tag.as_str()).filter(|t| !t.is_empty())
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(value)
        .map_err(|e| Error::InvalidConfig(format!("{}{}: {}", ENV_PREFIX, key, e)))
}
