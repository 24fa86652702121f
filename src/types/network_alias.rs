// ABOUTME: Validated network alias for service discovery on the deploy network.
// ABOUTME: Non-empty, alphanumeric plus hyphen, underscore and dot.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkAliasError {
    #[error("network alias cannot be empty")]
    Empty,

    #[error("invalid character in network alias: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkAlias(String);

impl NetworkAlias {
    pub fn new(value: &str) -> Result<Self, NetworkAliasError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(NetworkAliasError::Empty);
        }

        if let Some(c) = trimmed
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
        {
            return Err(NetworkAliasError::InvalidChar(c));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Service names use a subset of the alias charset.
    pub(crate) fn from_validated(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
