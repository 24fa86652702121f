// ABOUTME: Composable capability traits for the container engine.
// ABOUTME: ImageOps, ContainerOps, EventOps, LogOps and the combined ContainerEngine.

mod container;
mod events;
mod image;
mod logs;
mod shared_types;

pub use container::{
    APP_LABEL, ContainerError, ContainerFilters, ContainerOps, ContainerSummary, MANAGED_LABEL,
    OWNER_LABEL, SERVICE_LABEL,
};
pub use events::{EngineEvent, EventError, EventFilters, EventOps, EventStream, HEALTHY_ACTION};
pub use image::{ImageError, ImageOps};
pub use logs::{LogError, LogOps};
pub use shared_types::*;

use crate::types::ContainerId;
use async_trait::async_trait;

/// Everything a deployment needs from the engine.
///
/// Implemented automatically for any type providing all capabilities.
#[async_trait]
pub trait ContainerEngine: ImageOps + ContainerOps + EventOps + LogOps {
    /// Force-remove a container, then try to remove the image it ran.
    ///
    /// The image is often still used by another container; failing to
    /// remove it is logged and does not fail the call.
    async fn remove_container_and_image(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let image_id = match self.inspect_container(id).await {
            Ok(info) => info.image_id,
            Err(ContainerError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        self.remove_container(id, true).await?;

        if let Some(image_id) = image_id
            && let Err(e) = self.remove_image(&image_id, false).await
        {
            tracing::debug!(image = %image_id.short(), "image kept: {}", e);
        }

        Ok(())
    }
}

impl<T: ImageOps + ContainerOps + EventOps + LogOps> ContainerEngine for T {}
