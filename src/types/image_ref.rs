// ABOUTME: Container image reference parsing.
// ABOUTME: Handles nginx, nginx:tag, registry:port/org/image:tag@digest.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// An image reference exactly as declared in a manifest.
///
/// Unlike the engine, no tag is implied at parse time: `tag()` is `None`
/// for `nginx`. Use [`ImageRef::pullable`] to get the reference that
/// should actually be pulled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_' | '@'))
        {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) if !after.is_empty() => (before, Some(after.to_string())),
            Some(_) => return Err(ParseImageRefError::InvalidFormat(input.to_string())),
            None => (input, None),
        };

        // A colon followed by a slash belongs to a registry port, not a tag.
        let (without_tag, tag) = match without_digest.rsplit_once(':') {
            Some((_, after)) if after.contains('/') => (without_digest, None),
            Some((_, "")) => return Err(ParseImageRefError::InvalidFormat(input.to_string())),
            Some((before, after)) => (before, Some(after.to_string())),
            None => (without_digest, None),
        };

        let (registry, name) = match without_tag.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first.to_string()), rest.to_string())
            }
            _ => (None, without_tag.to_string()),
        };

        if name.is_empty() || name.starts_with('/') || name.ends_with('/') {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        Ok(Self {
            registry,
            name,
            tag,
            digest,
        })
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Whether the reference pins a version (tag or digest).
    pub fn is_pinned(&self) -> bool {
        self.tag.is_some() || self.digest.is_some()
    }

    /// Same repository with the given tag and no digest.
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            registry: self.registry.clone(),
            name: self.name.clone(),
            tag: Some(tag.to_string()),
            digest: None,
        }
    }

    /// The reference to pull: `latest` is appended when nothing is pinned.
    pub fn pullable(&self) -> Self {
        if self.is_pinned() {
            self.clone()
        } else {
            self.with_tag("latest")
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref registry) = self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_reference_is_not_pinned() {
        let img = ImageRef::parse("vibioh/dashboard").unwrap();
        assert!(img.tag().is_none());
        assert!(!img.is_pinned());
        assert_eq!(img.pullable().to_string(), "vibioh/dashboard:latest");
    }

    #[test]
    fn registry_port_is_not_a_tag() {
        let img = ImageRef::parse("localhost:5000/app").unwrap();
        assert_eq!(img.registry(), Some("localhost:5000"));
        assert_eq!(img.name(), "app");
        assert!(img.tag().is_none());
    }

    #[test]
    fn with_tag_drops_digest() {
        let img = ImageRef::parse("app@sha256:abc").unwrap();
        assert_eq!(img.with_tag("v2").to_string(), "app:v2");
    }

    #[test]
    fn trailing_colon_is_rejected() {
        assert!(ImageRef::parse("app:").is_err());
    }
}
