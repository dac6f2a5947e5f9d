//! Canonization (merge) error types.

use crate::ErrorClass;

/// Specific error conditions for merge operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum MergeErrorKind {
    /// Source and target share no common ancestor checkpoint
    #[display("Branches '{}' and '{}' share no common ancestor", source, target)]
    DivergentHistory {
        /// Source branch reference
        source: String,
        /// Target branch reference
        target: String,
    },
    /// A branch reference could not be parsed
    #[display("Malformed branch reference: {}", _0)]
    MalformedBranchRef(String),
}

impl MergeErrorKind {
    /// Error class of this condition.
    pub fn class(&self) -> ErrorClass {
        match self {
            MergeErrorKind::DivergentHistory { .. } => ErrorClass::Conflict,
            MergeErrorKind::MalformedBranchRef(_) => ErrorClass::InvalidInput,
        }
    }
}

/// Merge error with location tracking.
///
/// # Examples
///
/// ```
/// use codex_error::{ErrorClass, MergeError, MergeErrorKind};
///
/// let err = MergeError::new(MergeErrorKind::DivergentHistory {
///     source: "noir:main".into(),
///     target: "western:main".into(),
/// });
/// assert_eq!(err.kind.class(), ErrorClass::Conflict);
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Merge Error: {} at line {} in {}", kind, line, file)]
pub struct MergeError {
    /// The specific error condition
    pub kind: MergeErrorKind,
    /// Line number where the error was created
    pub line: u32,
    /// Source file where the error was created
    pub file: &'static str,
}

impl MergeError {
    /// Create a new MergeError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: MergeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
