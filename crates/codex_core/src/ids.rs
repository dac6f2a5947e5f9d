//! Content-derived identifiers.

use serde::{Deserialize, Serialize};

/// Identifier of an immutable checkpoint (hex SHA-256).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct CheckpointId(String);

impl CheckpointId {
    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The full hex id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated id for display (first 12 characters).
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl From<&str> for CheckpointId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of an artifact body under a given name (hex SHA-256 over the
/// slug and the content hash).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The full hex id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ArtifactId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
