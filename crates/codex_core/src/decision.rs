//! Decision point markers.

use serde::{Deserialize, Serialize};

/// Marks a checkpoint as a narrative fork origin.
///
/// A decision point never creates branches itself; branches appear when a
/// continuation is recorded with the marked checkpoint as parent.
///
/// ```
/// use codex_core::DecisionPoint;
///
/// let decision = DecisionPoint::new("Open the vault?", vec!["yes".into(), "no".into()]);
/// assert_eq!(decision.options().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct DecisionPoint {
    /// Prompt text (opaque)
    prompt: String,
    /// Option labels in presentation order
    options: Vec<String>,
}

impl DecisionPoint {
    /// Create a decision point.
    pub fn new(prompt: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options,
        }
    }
}
