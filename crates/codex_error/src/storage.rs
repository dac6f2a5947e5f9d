//! Storage error types.

use crate::ErrorClass;

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create a store directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write a file
    #[display("Failed to write file: {}", _0)]
    FileWrite(String),
    /// Failed to read a file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
    /// Blob or record not present in the store
    #[display("Not found in store: {}", _0)]
    NotFound(String),
    /// Stored bytes do not match their content address
    #[display("Hash mismatch: expected {}, got {}", expected, actual)]
    HashMismatch {
        /// Hash the blob was addressed by
        expected: String,
        /// Hash of the bytes actually read
        actual: String,
    },
    /// Malformed content reference
    #[display("Invalid content reference: {}", _0)]
    InvalidReference(String),
    /// Another session holds the data directory
    #[display("Data directory is in use by another session: {}", _0)]
    Locked(String),
}

impl StorageErrorKind {
    /// Error class of this condition.
    pub fn class(&self) -> ErrorClass {
        match self {
            StorageErrorKind::Locked(_) => ErrorClass::Conflict,
            _ => ErrorClass::Storage,
        }
    }
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use codex_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("stories/noir.json".to_string()));
/// assert!(format!("{}", err).contains("Not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
