// ABOUTME: Zero-downtime deployment of a compose manifest onto one engine.
// ABOUTME: Coordinator, per-app task registry, health monitor, and commit/rollback paths.

mod container;
mod coordinator;
mod error;
mod finalize;
mod health;
mod orphans;
mod outcome;
mod registry;
mod rollback;
mod service;
mod state;

pub use container::{
    BuildContext, DEFAULT_CPU_SHARES, MAX_MEMORY, MIN_MEMORY, build_container_config,
};
pub use coordinator::{Coordinator, DeployRequest, LOG_TAIL};
pub use error::{DeployError, DeployErrorKind};
pub use finalize::{promote, retire_previous};
pub use health::{HealthMonitor, HealthOutcome};
pub use orphans::{cleanup_orphans, split_orphans};
pub use outcome::DeploymentOutcome;
pub use registry::{TaskGuard, TaskRegistry};
pub use rollback::rollback;
pub use service::{
    DEPLOY_SUFFIX, DeployedService, ServiceSummary, VerificationState, deploy_name, final_name,
    is_deploy_name,
};
pub use state::Phase;
