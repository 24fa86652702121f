// ABOUTME: Validated application and service names.
// ABOUTME: Both end up inside engine container names, so they share its charset.

use super::network_alias::NetworkAlias;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Longest name accepted; keeps `app_service_deploy` well under engine limits.
const MAX_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name cannot be empty")]
    Empty,

    #[error("name exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("name must start with a letter or digit")]
    BadStart,

    #[error("invalid character in name: '{0}'")]
    InvalidChar(char),
}

/// Container names accept `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
fn validate(value: &str) -> Result<(), NameError> {
    let first = value.chars().next().ok_or(NameError::Empty)?;
    if value.len() > MAX_LEN {
        return Err(NameError::TooLong);
    }
    if !first.is_ascii_alphanumeric() {
        return Err(NameError::BadStart);
    }
    match value
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '.' | '-'))
    {
        Some(c) => Err(NameError::InvalidChar(c)),
        None => Ok(()),
    }
}

/// Name of a deployed application; the prefix of all its container names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, NameError> {
        validate(value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of one service inside a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, NameError> {
        validate(value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Services are reachable on the deploy network under their own name.
    pub fn as_alias(&self) -> NetworkAlias {
        NetworkAlias::from_validated(self.0.clone())
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for AppName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl Serialize for ServiceName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_compose_style_names() {
        assert!(ServiceName::new("web").is_ok());
        assert!(ServiceName::new("api_v2").is_ok());
        assert!(AppName::new("My.App-1").is_ok());
    }

    #[test]
    fn rejects_leading_separator() {
        assert_eq!(AppName::new("-app"), Err(NameError::BadStart));
        assert_eq!(ServiceName::new("_web"), Err(NameError::BadStart));
    }

    #[test]
    fn rejects_slashes_and_spaces() {
        assert_eq!(AppName::new("a/b"), Err(NameError::InvalidChar('/')));
        assert_eq!(AppName::new("a b"), Err(NameError::InvalidChar(' ')));
    }

    #[test]
    fn rejects_empty_and_long() {
        assert_eq!(AppName::new(""), Err(NameError::Empty));
        assert_eq!(AppName::new(&"a".repeat(64)), Err(NameError::TooLong));
    }
}
