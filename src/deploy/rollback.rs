// ABOUTME: Failure path: remove every container this deployment created.
// ABOUTME: Each service is cleaned independently; the previous deployment is untouched.

use std::time::Duration;

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::ContainerEngine;

use super::service::DeployedService;

/// Inspect, stop and force-remove each new container with its image.
///
/// A failure on one service is recorded and the next service is still
/// cleaned. Returns the number of containers removed.
pub async fn rollback<E: ContainerEngine + ?Sized>(
    engine: &E,
    services: &[DeployedService],
    stop_timeout: Duration,
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut removed = 0;

    for service in services {
        let name = service.name.as_str();
        let info = match engine.inspect_container(&service.container_id).await {
            Ok(info) => info,
            Err(e) => {
                diagnostics.warn(Warning::inspect_failed(
                    name,
                    format!("cannot inspect {}: {}", service.full_name, e),
                ));
                continue;
            }
        };

        if info.state.is_stoppable()
            && let Err(e) = engine
                .stop_container(&service.container_id, stop_timeout)
                .await
        {
            diagnostics.warn(Warning::stop_failed(
                name,
                format!("cannot stop {}: {}", service.full_name, e),
            ));
        }

        match engine
            .remove_container_and_image(&service.container_id)
            .await
        {
            Ok(()) => {
                tracing::debug!(service = %name, container = %service.container_id.short(), "removed");
                removed += 1;
            }
            Err(e) => diagnostics.warn(Warning::remove_failed(
                name,
                format!("cannot remove {}: {}", service.full_name, e),
            )),
        }
    }

    removed
}
