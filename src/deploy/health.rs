// ABOUTME: Waits for new containers to report healthy on the engine event stream.
// ABOUTME: Races the deadline, the next event, and stream errors; deadline wins ties.

use futures::StreamExt;
use std::collections::HashSet;
use tokio::time::Instant;

use super::service::{DeployedService, VerificationState};
use crate::runtime::{EventError, EventFilters, EventOps, HealthState};
use crate::types::ContainerId;

/// How a health wait ended.
#[derive(Debug)]
pub enum HealthOutcome {
    /// Every candidate reported healthy.
    Healthy,
    /// The deadline passed first.
    TimedOut { confirmed: usize, expected: usize },
    /// The subscription failed or ended.
    StreamFailed(EventError),
}

impl HealthOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthOutcome::Healthy)
    }

    pub fn describe(&self) -> String {
        match self {
            HealthOutcome::Healthy => "all containers healthy".to_string(),
            HealthOutcome::TimedOut {
                confirmed,
                expected,
            } => format!(
                "deadline reached with {} of {} containers healthy",
                confirmed, expected
            ),
            HealthOutcome::StreamFailed(e) => e.to_string(),
        }
    }
}

pub struct HealthMonitor<'a, E: EventOps + ?Sized> {
    engine: &'a E,
}

impl<'a, E: EventOps + ?Sized> HealthMonitor<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Wait until every id in `candidates` reports healthy or `deadline` passes.
    ///
    /// Services are marked healthy as their events arrive. On failure every
    /// candidate not yet confirmed is marked unhealthy. The subscription is
    /// dropped before returning.
    pub async fn await_healthy(
        &self,
        services: &mut [DeployedService],
        candidates: &[ContainerId],
        deadline: Instant,
    ) -> HealthOutcome {
        if candidates.is_empty() {
            return HealthOutcome::Healthy;
        }

        let mut confirmed: HashSet<ContainerId> = HashSet::with_capacity(candidates.len());
        let outcome = self
            .wait(services, candidates, deadline, &mut confirmed)
            .await;

        if !outcome.is_healthy() {
            for service in services.iter_mut() {
                if candidates.contains(&service.container_id)
                    && !confirmed.contains(&service.container_id)
                {
                    service.state = VerificationState::Unhealthy;
                }
            }
        }

        outcome
    }

    async fn wait(
        &self,
        services: &mut [DeployedService],
        candidates: &[ContainerId],
        deadline: Instant,
        confirmed: &mut HashSet<ContainerId>,
    ) -> HealthOutcome {
        let filters = EventFilters::healthy(candidates.iter().cloned());
        let mut stream = match self.engine.subscribe_events(&filters).await {
            Ok(stream) => stream,
            Err(e) => return HealthOutcome::StreamFailed(e),
        };

        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;

                _ = &mut sleep => {
                    return HealthOutcome::TimedOut {
                        confirmed: confirmed.len(),
                        expected: candidates.len(),
                    };
                }

                next = stream.next() => match next {
                    Some(Ok(event)) => {
                        if event.health_status() != Some(HealthState::Healthy)
                            || !candidates.contains(&event.container)
                        {
                            continue;
                        }
                        if confirmed.insert(event.container.clone())
                            && let Some(service) = services
                                .iter_mut()
                                .find(|s| s.container_id == event.container)
                        {
                            tracing::info!(
                                service = %service.name,
                                container = %event.container.short(),
                                "container healthy"
                            );
                            service.state = VerificationState::Healthy;
                        }
                        if confirmed.len() == candidates.len() {
                            return HealthOutcome::Healthy;
                        }
                    }
                    Some(Err(e)) => return HealthOutcome::StreamFailed(e),
                    None => return HealthOutcome::StreamFailed(EventError::Closed),
                },
            }
        }
    }
}
