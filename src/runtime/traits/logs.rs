// ABOUTME: Log retrieval trait for the container engine.
// ABOUTME: Fetches the tail of a container's combined stdout/stderr.

use crate::types::ContainerId;
use async_trait::async_trait;

/// Log retrieval.
#[async_trait]
pub trait LogOps: Send + Sync {
    /// The last `tail` lines of a container's output, oldest first.
    async fn container_logs(&self, id: &ContainerId, tail: usize)
    -> Result<Vec<String>, LogError>;
}

/// Errors from log operations.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("stream error: {0}")]
    StreamError(String),
}
