//! Top-level error wrapper types.

use crate::{
    ConfigError, ErrorClass, InvariantError, JsonError, LogError, MergeError, RegistryError,
    StorageError,
};

/// Every error the Codex crates can return.
///
/// # Examples
///
/// ```
/// use codex_error::{CodexError, ConfigError};
///
/// let err: CodexError = ConfigError::new("missing data_dir").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CodexErrorKind {
    /// Checkpoint log or decision index error
    #[from(LogError)]
    Log(LogError),
    /// Artifact registry error
    #[from(RegistryError)]
    Registry(RegistryError),
    /// Canonization (merge) error
    #[from(MergeError)]
    Merge(MergeError),
    /// Persistence error
    #[from(StorageError)]
    Storage(StorageError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Internal invariant violation
    #[from(InvariantError)]
    Invariant(InvariantError),
}

/// Codex error with kind discrimination.
///
/// # Examples
///
/// ```
/// use codex_error::{CodexResult, ErrorClass, InvariantError};
///
/// fn might_fail() -> CodexResult<()> {
///     Err(InvariantError::new("lock poisoned"))?
/// }
///
/// assert_eq!(might_fail().unwrap_err().class(), ErrorClass::Invariant);
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Codex Error: {}", _0)]
pub struct CodexError(Box<CodexErrorKind>);

impl CodexError {
    /// Create a new error from a kind.
    pub fn new(kind: CodexErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CodexErrorKind {
        &self.0
    }

    /// Class of this error, used for caller decisions and exit codes.
    pub fn class(&self) -> ErrorClass {
        match self.kind() {
            CodexErrorKind::Log(e) => e.kind.class(),
            CodexErrorKind::Registry(e) => e.kind.class(),
            CodexErrorKind::Merge(e) => e.kind.class(),
            CodexErrorKind::Invariant(_) => ErrorClass::Invariant,
            CodexErrorKind::Storage(e) => e.kind.class(),
            CodexErrorKind::Config(_) | CodexErrorKind::Json(_) => ErrorClass::Storage,
        }
    }
}

// Generic From implementation for any type that converts to CodexErrorKind
impl<T> From<T> for CodexError
where
    T: Into<CodexErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Codex operations.
pub type CodexResult<T> = std::result::Result<T, CodexError>;
