//! Convergence threshold sets.

use codex_error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default milestone counts at which convergence events fire.
pub const DEFAULT_THRESHOLDS: [u64; 5] = [10, 25, 50, 100, 144];

/// A validated, strictly ascending set of non-zero thresholds.
///
/// # Examples
///
/// ```
/// use codex_core::Thresholds;
///
/// let thresholds = Thresholds::default();
/// assert_eq!(thresholds.largest(), 144);
/// assert!(Thresholds::new(vec![25, 10]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct Thresholds(Vec<u64>);

impl Thresholds {
    /// Validate and wrap a threshold list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, contains zero, or is not
    /// strictly ascending.
    pub fn new(values: Vec<u64>) -> Result<Self, ConfigError> {
        if values.is_empty() {
            return Err(ConfigError::new("threshold list must not be empty"));
        }
        if values.contains(&0) {
            return Err(ConfigError::new("thresholds must be greater than zero"));
        }
        if let Some(pair) = values.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::new(format!(
                "thresholds must be strictly ascending, got {} before {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self(values))
    }

    /// Thresholds in ascending order.
    pub fn values(&self) -> &[u64] {
        &self.0
    }

    /// Largest threshold (the completion target).
    pub fn largest(&self) -> u64 {
        self.0.last().copied().unwrap_or_default()
    }

    /// Smallest threshold strictly greater than `count`.
    pub fn next_after(&self, count: u64) -> Option<u64> {
        self.0.iter().copied().find(|t| *t > count)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLDS.to_vec())
    }
}

impl TryFrom<Vec<u64>> for Thresholds {
    type Error = ConfigError;

    fn try_from(values: Vec<u64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<Thresholds> for Vec<u64> {
    fn from(thresholds: Thresholds) -> Self {
        thresholds.0
    }
}
