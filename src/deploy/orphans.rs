// ABOUTME: Leftover containers from interrupted deployments.
// ABOUTME: Split them out of the previous snapshot and remove them before a new run.

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::{ContainerEngine, ContainerSummary};

use super::service::is_deploy_name;

/// Separate the running deployment from containers still carrying the
/// temporary suffix. Returns `(previous, orphans)`.
pub fn split_orphans(
    containers: Vec<ContainerSummary>,
) -> (Vec<ContainerSummary>, Vec<ContainerSummary>) {
    containers
        .into_iter()
        .partition(|c| !is_deploy_name(&c.name))
}

/// Force-remove orphans. Failures are recorded and do not stop the others.
///
/// Returns the number of containers removed.
pub async fn cleanup_orphans<E: ContainerEngine + ?Sized>(
    engine: &E,
    orphans: &[ContainerSummary],
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut cleaned = 0;

    for orphan in orphans {
        tracing::info!(container = %orphan.name, "removing leftover container");
        match engine.remove_container_and_image(&orphan.id).await {
            Ok(()) => cleaned += 1,
            Err(e) => diagnostics.warn(Warning::orphan_cleanup(
                &orphan.name,
                format!("cannot remove leftover container {}: {}", orphan.name, e),
            )),
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContainerId;
    use std::collections::HashMap;

    fn summary(name: &str) -> ContainerSummary {
        ContainerSummary {
            id: ContainerId::new(format!("id-{}", name)),
            name: name.to_string(),
            image: "app:1.0".to_string(),
            state: "running".to_string(),
            labels: HashMap::new(),
        }
    }

    #[test]
    fn temporary_names_are_orphans() {
        let (previous, orphans) = split_orphans(vec![
            summary("shop_web"),
            summary("shop_web_deploy"),
            summary("shop_db"),
        ]);
        let previous: Vec<_> = previous.iter().map(|c| c.name.as_str()).collect();
        let orphans: Vec<_> = orphans.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(previous, vec!["shop_web", "shop_db"]);
        assert_eq!(orphans, vec!["shop_web_deploy"]);
    }
}
