// ABOUTME: Phantom-typed engine identifiers.
// ABOUTME: Keeps container ids and image ids from being passed for one another.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

pub enum ContainerMarker {}
pub enum ImageMarker {}

/// Identifier assigned by the container engine.
///
/// The marker parameter only exists at compile time; two ids with different
/// markers never compare or convert into each other.
#[must_use = "ids reference engine resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The 12-character prefix the engine CLI shows.
    pub fn short(&self) -> &str {
        let end = self
            .value
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len());
        &self.value[..end]
    }
}

// Manual impls: T is a marker and implements nothing.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

pub type ContainerId = Id<ContainerMarker>;
pub type ImageId = Id<ImageMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_truncates_long_ids() {
        let id = ContainerId::new("0123456789abcdef0123");
        assert_eq!(id.short(), "0123456789ab");
    }

    #[test]
    fn short_keeps_short_ids() {
        let id = ContainerId::new("abc");
        assert_eq!(id.short(), "abc");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ImageId::new("sha256:abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"sha256:abc\"");
    }
}
