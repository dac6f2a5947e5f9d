//! Checkpoint log error types.

use crate::ErrorClass;

/// Specific error conditions for checkpoint log and decision index operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum LogErrorKind {
    /// Story id is not known to the log
    #[display("Story '{}' not found", _0)]
    StoryNotFound(String),
    /// Story id is already taken
    #[display("Story '{}' already exists", _0)]
    StoryExists(String),
    /// Checkpoint is absent (globally or from the story's known history)
    #[display("Checkpoint '{}' not found", _0)]
    CheckpointNotFound(String),
    /// Branch name is not defined for the story
    #[display("Branch '{}' not found in story '{}'", branch, story)]
    BranchNotFound {
        /// Story id
        story: String,
        /// Branch name
        branch: String,
    },
    /// Parent checkpoint is not reachable from the story's known checkpoints
    #[display("Unknown parent checkpoint '{}' for story '{}'", parent, story)]
    UnknownParent {
        /// Story id
        story: String,
        /// Parent checkpoint id
        parent: String,
    },
    /// A story that already has history was asked to start a second root
    #[display("Story '{}' already has a root checkpoint; a parent is required", _0)]
    MissingParent(String),
    /// Branch name already exists for the story
    #[display("Branch '{}' already exists in story '{}'", branch, story)]
    BranchNameTaken {
        /// Story id
        story: String,
        /// Branch name
        branch: String,
    },
    /// Branch head moved while an operation was relying on it
    #[display("Branch '{}' of story '{}' moved during the operation", branch, story)]
    BranchMoved {
        /// Story id
        story: String,
        /// Branch name
        branch: String,
    },
    /// Checkpoint already carries a decision marker
    #[display("Checkpoint '{}' is already marked as a decision point", _0)]
    AlreadyMarked(String),
    /// Malformed input (empty branch name, empty option list, ...)
    #[display("Invalid input: {}", _0)]
    InvalidInput(String),
}

impl LogErrorKind {
    /// Error class of this condition.
    pub fn class(&self) -> ErrorClass {
        match self {
            LogErrorKind::StoryNotFound(_)
            | LogErrorKind::CheckpointNotFound(_)
            | LogErrorKind::BranchNotFound { .. }
            | LogErrorKind::UnknownParent { .. } => ErrorClass::NotFound,
            LogErrorKind::StoryExists(_)
            | LogErrorKind::BranchNameTaken { .. }
            | LogErrorKind::BranchMoved { .. }
            | LogErrorKind::AlreadyMarked(_) => ErrorClass::Conflict,
            LogErrorKind::MissingParent(_) | LogErrorKind::InvalidInput(_) => {
                ErrorClass::InvalidInput
            }
        }
    }
}

/// Checkpoint log error with location tracking.
///
/// # Examples
///
/// ```
/// use codex_error::{LogError, LogErrorKind};
///
/// let err = LogError::new(LogErrorKind::AlreadyMarked("abc123".to_string()));
/// assert!(format!("{}", err).contains("already marked"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Log Error: {} at line {} in {}", kind, line, file)]
pub struct LogError {
    /// The specific error condition
    pub kind: LogErrorKind,
    /// Line number where the error was created
    pub line: u32,
    /// Source file where the error was created
    pub file: &'static str,
}

impl LogError {
    /// Create a new LogError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: LogErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
