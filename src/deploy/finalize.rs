// ABOUTME: Success path: retire the previous containers and promote the new ones.
// ABOUTME: Old containers are stopped then removed; new ones lose their temporary suffix.

use snafu::ResultExt;
use std::time::Duration;

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::{ContainerEngine, ContainerSummary};
use crate::types::AppName;

use super::error::{DeployError, RemoveOldSnafu};
use super::service::DeployedService;

/// Stop every old container, then remove them.
///
/// Stop failures are recorded and removal still proceeds. The first removal
/// failure ends the phase and is returned.
pub async fn retire_previous<E: ContainerEngine + ?Sized>(
    engine: &E,
    app: &AppName,
    previous: &[ContainerSummary],
    stop_timeout: Duration,
    diagnostics: &mut Diagnostics,
) -> Result<(), DeployError> {
    for container in previous {
        if let Err(e) = engine.stop_container(&container.id, stop_timeout).await {
            diagnostics.warn(Warning::stop_failed(
                &container.name,
                format!("cannot stop previous container {}: {}", container.name, e),
            ));
        }
    }

    for container in previous {
        engine
            .remove_container(&container.id, true)
            .await
            .context(RemoveOldSnafu {
                app: app.clone(),
                container: container.name.clone(),
            })?;
        tracing::debug!(container = %container.name, "previous container removed");
    }

    Ok(())
}

/// Rename every new container to its stable name.
///
/// A failed rename is recorded and the remaining services are still renamed.
/// Returns the number of containers renamed.
pub async fn promote<E: ContainerEngine + ?Sized>(
    engine: &E,
    services: &[DeployedService],
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut renamed = 0;

    for service in services {
        match engine
            .rename_container(&service.container_id, service.final_name())
            .await
        {
            Ok(()) => renamed += 1,
            Err(e) => diagnostics.warn(Warning::rename_failed(
                service.name.as_str(),
                format!(
                    "cannot rename {} to {}: {}",
                    service.full_name,
                    service.final_name(),
                    e
                ),
            )),
        }
    }

    renamed
}
