// ABOUTME: Container engine access for deployments.
// ABOUTME: Capability traits plus the bollard-backed Docker implementation.

mod bollard;
mod error;
pub mod traits;

pub use bollard::BollardRuntime;
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::*;
