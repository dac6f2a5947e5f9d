//! Coarse error classes used for caller decisions and exit codes.

use serde::{Deserialize, Serialize};

/// The class an error belongs to.
///
/// Classes are stable across error areas: a missing story and a missing
/// registry entry are both [`ErrorClass::NotFound`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Unknown story, checkpoint, branch or registry entry
    #[display("not-found")]
    NotFound,
    /// Name taken, already marked, divergent history, data directory in use
    #[display("conflict")]
    Conflict,
    /// Malformed input the caller must correct
    #[display("invalid-input")]
    InvalidInput,
    /// Internal invariant violation (programming error)
    #[display("invariant")]
    Invariant,
    /// Persistence, configuration or serialization failure
    #[display("storage")]
    Storage,
}

impl ErrorClass {
    /// Process exit status for this class.
    ///
    /// `0` is reserved for success.
    ///
    /// ```
    /// use codex_error::ErrorClass;
    ///
    /// assert_eq!(ErrorClass::NotFound.exit_code(), 2);
    /// assert_eq!(ErrorClass::Conflict.exit_code(), 3);
    /// ```
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorClass::NotFound => 2,
            ErrorClass::Conflict => 3,
            ErrorClass::InvalidInput => 4,
            ErrorClass::Invariant => 5,
            ErrorClass::Storage => 6,
        }
    }
}
