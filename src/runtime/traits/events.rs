// ABOUTME: Event subscription trait for the container engine.
// ABOUTME: Streams container lifecycle notifications such as health transitions.

use super::shared_types::HealthState;
use crate::types::ContainerId;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Action the engine reports when a health check starts passing.
pub const HEALTHY_ACTION: &str = "health_status: healthy";

/// A live subscription. Dropping it closes the subscription on the engine side.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EngineEvent, EventError>> + Send>>;

/// Event subscription.
#[async_trait]
pub trait EventOps: Send + Sync {
    /// Subscribe to container events matching `filters`.
    ///
    /// Transport failures after the subscription is established arrive as
    /// `Err` items on the stream.
    async fn subscribe_events(&self, filters: &EventFilters) -> Result<EventStream, EventError>;
}

/// Which events a subscription should receive.
#[derive(Debug, Clone, Default)]
pub struct EventFilters {
    /// Only events about these containers. Empty means all containers.
    pub containers: Vec<ContainerId>,
    /// Only these actions. Empty means all actions.
    pub actions: Vec<String>,
}

impl EventFilters {
    /// Health checks of `containers` turning healthy.
    pub fn healthy(containers: impl IntoIterator<Item = ContainerId>) -> Self {
        Self {
            containers: containers.into_iter().collect(),
            actions: vec![HEALTHY_ACTION.to_string()],
        }
    }
}

/// A container event as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub container: ContainerId,
    pub action: String,
}

impl EngineEvent {
    /// The new health state, if this is a health-status transition.
    pub fn health_status(&self) -> Option<HealthState> {
        let status = self.action.strip_prefix("health_status:")?;
        Some(match status.trim() {
            "healthy" => HealthState::Healthy,
            "unhealthy" => HealthState::Unhealthy,
            "starting" => HealthState::Starting,
            _ => HealthState::None,
        })
    }
}

/// Errors from event subscriptions.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("subscription failed: {0}")]
    Subscribe(String),

    #[error("event stream error: {0}")]
    Stream(String),

    #[error("event stream closed")]
    Closed,
}
