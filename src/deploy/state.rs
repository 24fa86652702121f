// ABOUTME: Phases a deployment moves through, in order.
// ABOUTME: Recorded on log lines so a stalled deployment shows where it stopped.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Validating,
    ParsingManifest,
    PullingImages,
    CreatingContainers,
    Starting,
    AwaitingHealth,
    Finalizing,
    RollingBack,
    Notifying,
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validating => "validating",
            Phase::ParsingManifest => "parsing_manifest",
            Phase::PullingImages => "pulling_images",
            Phase::CreatingContainers => "creating_containers",
            Phase::Starting => "starting",
            Phase::AwaitingHealth => "awaiting_health",
            Phase::Finalizing => "finalizing",
            Phase::RollingBack => "rolling_back",
            Phase::Notifying => "notifying",
            Phase::Done => "done",
        }
    }

    /// Phases that run after the caller has its response.
    pub fn is_background(&self) -> bool {
        *self >= Phase::AwaitingHealth
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
