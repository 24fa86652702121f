// ABOUTME: Library root for swapdock - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod auth;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod manifest;
pub mod notify;
pub mod output;
pub mod runtime;
pub mod types;
