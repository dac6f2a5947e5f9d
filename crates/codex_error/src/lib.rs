//! Error types for the Codex.
//!
//! This crate provides the error taxonomy shared by every Codex crate.
//!
//! # Error Hierarchy
//!
//! Errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum names the specific condition (which id, which invariant)
//! - `*Error` struct wraps the kind with the source location that raised it
//! - Constructors use `#[track_caller]` for automatic location capture
//!
//! Every error also belongs to an [`ErrorClass`], which is what callers branch
//! on: `NotFound` and `Conflict` need a caller decision, `InvalidInput` needs
//! corrected input, `Invariant` marks a programming error that failed only the
//! offending call.
//!
//! # Examples
//!
//! ```
//! use codex_error::{CodexResult, ErrorClass, LogError, LogErrorKind};
//!
//! fn find_story() -> CodexResult<()> {
//!     Err(LogError::new(LogErrorKind::StoryNotFound("noir_01".to_string())))?
//! }
//!
//! let err = find_story().unwrap_err();
//! assert_eq!(err.class(), ErrorClass::NotFound);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod class;
mod error;
mod log;
mod merge;
mod message;
mod registry;
mod storage;

pub use class::ErrorClass;
pub use error::{CodexError, CodexErrorKind, CodexResult};
pub use log::{LogError, LogErrorKind};
pub use merge::{MergeError, MergeErrorKind};
pub use message::{ConfigError, InvariantError, JsonError};
pub use registry::{RegistryError, RegistryErrorKind};
pub use storage::{StorageError, StorageErrorKind};
