//! Message-only error types (configuration, JSON, internal invariants).

macro_rules! message_error {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
        #[display("{}: {} at line {} in {}", $label, message, line, file)]
        pub struct $name {
            /// Error message
            pub message: String,
            /// Line number where the error occurred
            pub line: u32,
            /// File where the error occurred
            pub file: &'static str,
        }

        impl $name {
            /// Create a new error with the given message at the current location.
            #[track_caller]
            pub fn new(message: impl Into<String>) -> Self {
                let location = std::panic::Location::caller();
                Self {
                    message: message.into(),
                    line: location.line(),
                    file: location.file(),
                }
            }
        }
    };
}

message_error!(
    /// Configuration error with source location.
    ///
    /// ```
    /// use codex_error::ConfigError;
    ///
    /// let err = ConfigError::new("thresholds must be ascending");
    /// assert!(err.message.contains("ascending"));
    /// ```
    ConfigError,
    "Configuration Error"
);

message_error!(
    /// JSON serialization/deserialization error with source location.
    JsonError,
    "JSON Error"
);

message_error!(
    /// Internal invariant violation.
    ///
    /// Raised for programming errors such as a checkpoint id colliding with a
    /// node that has a different parent, or a poisoned lock. It fails only the
    /// call that detected it.
    ///
    /// ```
    /// use codex_error::InvariantError;
    ///
    /// let err = InvariantError::new("checkpoint id collision");
    /// assert!(format!("{}", err).starts_with("Invariant Violation"));
    /// ```
    InvariantError,
    "Invariant Violation"
);
