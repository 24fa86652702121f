// ABOUTME: Application-wide error types for swapdock.
// ABOUTME: Wraps settings, I/O, engine, and deployment failures for the binary.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::manifest::ManifestError;
use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

pub type Result<T> = std::result::Result<T, Error>;
