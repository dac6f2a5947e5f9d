//! Artifact registry error types.

use crate::ErrorClass;

/// Specific error conditions for registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RegistryErrorKind {
    /// No entry owns the given canonical or variant name
    #[display("Registry entry '{}' not found", _0)]
    EntryNotFound(String),
    /// Name is not one of the artifact categories
    #[display("Unknown category '{}'", _0)]
    UnknownCategory(String),
    /// Artifact is malformed (empty name, no classifiable content)
    #[display("Invalid artifact: {}", _0)]
    InvalidArtifact(String),
    /// The same (story, checkpoint, name) was re-ingested with different content
    #[display(
        "Artifact '{}' at checkpoint '{}' of story '{}' was already ingested with different content",
        name,
        checkpoint,
        story
    )]
    ConflictingReingest {
        /// Origin story id
        story: String,
        /// Checkpoint of introduction
        checkpoint: String,
        /// Slugged artifact name
        name: String,
    },
}

impl RegistryErrorKind {
    /// Error class of this condition.
    pub fn class(&self) -> ErrorClass {
        match self {
            RegistryErrorKind::EntryNotFound(_) => ErrorClass::NotFound,
            RegistryErrorKind::UnknownCategory(_)
            | RegistryErrorKind::InvalidArtifact(_)
            | RegistryErrorKind::ConflictingReingest { .. } => ErrorClass::InvalidInput,
        }
    }
}

/// Registry error with location tracking.
///
/// # Examples
///
/// ```
/// use codex_error::{ErrorClass, RegistryError, RegistryErrorKind};
///
/// let err = RegistryError::new(RegistryErrorKind::InvalidArtifact("empty name".into()));
/// assert_eq!(err.kind.class(), ErrorClass::InvalidInput);
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Registry Error: {} at line {} in {}", kind, line, file)]
pub struct RegistryError {
    /// The specific error condition
    pub kind: RegistryErrorKind,
    /// Line number where the error was created
    pub line: u32,
    /// Source file where the error was created
    pub file: &'static str,
}

impl RegistryError {
    /// Create a new RegistryError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RegistryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
