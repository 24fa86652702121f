// ABOUTME: Engine connection error types with SNAFU context.
// ABOUTME: Records which socket a failed connection or ping was aimed at.

use snafu::Snafu;

/// Failure to reach the container engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("cannot connect to engine at {endpoint}: {source}"))]
    Connect {
        endpoint: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("engine at {endpoint} did not answer ping: {source}"))]
    Ping {
        endpoint: String,
        source: bollard::errors::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// The client could not be built (bad socket path, unsupported scheme).
    ConnectionFailed,
    /// The engine did not respond.
    Unreachable,
}

impl RuntimeError {
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Connect { .. } => RuntimeErrorKind::ConnectionFailed,
            RuntimeError::Ping { .. } => RuntimeErrorKind::Unreachable,
        }
    }
}
