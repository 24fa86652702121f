// ABOUTME: Image operations trait for the container engine.
// ABOUTME: Pull and remove images.

use crate::types::{ImageId, ImageRef};
use async_trait::async_trait;

/// Image operations.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Pull an image, returning once the engine reports the pull complete.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;

    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("engine error: {0}")]
    Engine(String),
}
