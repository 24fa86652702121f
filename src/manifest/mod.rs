// ABOUTME: Compose manifest decoding into an ordered list of service definitions.
// ABOUTME: Unescapes `$$`, keeps declaration order, and validates service names.

mod environment;
mod healthcheck;
mod restart_policy;

pub use environment::KeyValues;
pub use healthcheck::{Healthcheck, HealthcheckTest};
pub use restart_policy::RestartPolicy;

use crate::types::{ImageRef, NameError, ServiceName};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::time::Duration;

/// Errors from decoding a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest is not valid UTF-8")]
    InvalidUtf8,

    #[error("manifest is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("manifest declares no services")]
    NoServices,

    #[error("service names must be strings")]
    NonStringKey,

    #[error("invalid service name '{name}': {source}")]
    InvalidServiceName { name: String, source: NameError },

    #[error("invalid definition for service '{name}': {source}")]
    InvalidService {
        name: String,
        source: serde_yaml::Error,
    },

    #[error("service '{service}': invalid port mapping '{spec}'")]
    InvalidPort { service: String, spec: String },

    #[error("service '{service}': invalid volume '{spec}'")]
    InvalidVolume { service: String, spec: String },

    #[error("service '{service}': invalid memory limit")]
    InvalidMemory { service: String },
}

/// Either a single shell-style string or an argument list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    String(String),
    List(Vec<String>),
}

impl StringOrList {
    pub fn to_args(&self) -> Vec<String> {
        match self {
            StringOrList::String(s) => s.split_whitespace().map(str::to_string).collect(),
            StringOrList::List(args) => args.clone(),
        }
    }
}

/// Memory limit as bytes or a `k`/`m`/`g` suffixed string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MemoryLimit {
    Bytes(u64),
    Text(String),
}

impl MemoryLimit {
    pub fn bytes(&self) -> Option<u64> {
        match self {
            MemoryLimit::Bytes(n) => Some(*n),
            MemoryLimit::Text(s) => parse_memory_string(s),
        }
    }
}

/// Parse a memory string like "512m" or "1g" into bytes.
fn parse_memory_string(spec: &str) -> Option<u64> {
    let spec = spec.trim().to_lowercase();
    let spec = spec.strip_suffix('b').unwrap_or(&spec);
    let (num_str, multiplier) = if let Some(n) = spec.strip_suffix('g') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = spec.strip_suffix('m') {
        (n, 1024 * 1024)
    } else if let Some(n) = spec.strip_suffix('k') {
        (n, 1024)
    } else {
        (spec, 1)
    };

    num_str.parse::<u64>().ok().map(|n| n * multiplier)
}

/// One service as declared in the manifest. Unknown compose keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
    #[serde(deserialize_with = "deserialize_image_ref")]
    pub image: ImageRef,

    #[serde(default)]
    pub ports: Vec<String>,

    #[serde(default)]
    pub environment: KeyValues,

    #[serde(default)]
    pub volumes: Vec<String>,

    #[serde(default)]
    pub labels: KeyValues,

    #[serde(default)]
    pub command: Option<StringOrList>,

    #[serde(default)]
    pub entrypoint: Option<StringOrList>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub cpu_shares: Option<u32>,

    #[serde(default)]
    pub mem_limit: Option<MemoryLimit>,

    #[serde(default)]
    pub restart: Option<RestartPolicy>,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default, with = "humantime_serde")]
    pub stop_grace_period: Option<Duration>,

    #[serde(default)]
    pub healthcheck: Option<Healthcheck>,
}

#[derive(Deserialize)]
struct ComposeDocument {
    #[serde(default)]
    services: serde_yaml::Mapping,
}

/// A decoded manifest: at least one service, in declaration order.
#[derive(Debug, Clone)]
pub struct Manifest {
    services: NonEmpty<(ServiceName, ServiceDefinition)>,
}

impl Manifest {
    /// Decode raw manifest bytes.
    pub fn parse(raw: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(raw).map_err(|_| ManifestError::InvalidUtf8)?;
        let text = text.replace("$$", "$");

        let document: ComposeDocument = serde_yaml::from_str(&text)?;

        let mut services = Vec::with_capacity(document.services.len());
        for (key, value) in document.services {
            let name = key.as_str().ok_or(ManifestError::NonStringKey)?;
            let service_name =
                ServiceName::new(name).map_err(|source| ManifestError::InvalidServiceName {
                    name: name.to_string(),
                    source,
                })?;
            let definition = serde_yaml::from_value(value).map_err(|source| {
                ManifestError::InvalidService {
                    name: name.to_string(),
                    source,
                }
            })?;
            services.push((service_name, definition));
        }

        let services = NonEmpty::from_vec(services).ok_or(ManifestError::NoServices)?;
        Ok(Self { services })
    }

    pub fn services(&self) -> impl Iterator<Item = (&ServiceName, &ServiceDefinition)> {
        self.services.iter().map(|(name, def)| (name, def))
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, def)| def)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Always false; a manifest holds at least one service.
    pub fn is_empty(&self) -> bool {
        false
    }
}

fn deserialize_image_ref<'de, D>(deserializer: D) -> Result<ImageRef, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ImageRef::parse(&s).map_err(serde::de::Error::custom)
}
