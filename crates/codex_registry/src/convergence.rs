//! Convergence threshold tracking.

use chrono::{DateTime, Utc};
use codex_core::Thresholds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// A one-time fact: the artifact count crossed a threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ConvergenceEvent {
    /// Threshold value
    threshold: u64,
    /// Total artifact count when the crossing was detected
    total_at_crossing: u64,
    /// When the crossing was detected
    crossed_at: DateTime<Utc>,
    /// Entry of the record that reached the threshold
    trigger_entry: String,
}

impl ConvergenceEvent {
    /// Create an event.
    pub fn new(
        threshold: u64,
        total_at_crossing: u64,
        crossed_at: DateTime<Utc>,
        trigger_entry: impl Into<String>,
    ) -> Self {
        Self {
            threshold,
            total_at_crossing,
            crossed_at,
            trigger_entry: trigger_entry.into(),
        }
    }
}

/// Position of the registry relative to one threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdState {
    /// Not crossed yet
    #[display("below")]
    Below,
    /// Crossed; the count equals the threshold
    #[display("at")]
    At,
    /// Crossed; the count is past the threshold
    #[display("above")]
    Above,
}

/// Read-only progress projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceStatus {
    /// Total ingested records
    pub current_artifacts: u64,
    /// Smallest threshold above the count, if any
    pub next_threshold: Option<u64>,
    /// Count over the next threshold (1.0 when every threshold is behind)
    pub progress_to_next: f64,
    /// Count over the largest threshold
    pub pattern_completion: f64,
}

/// Fires each threshold exactly once, in ascending order.
///
/// Crossing is monotonic: a crossed threshold stays crossed for the lifetime
/// of the engine, including across restores from recorded events.
///
/// ```
/// use codex_core::Thresholds;
/// use codex_registry::{ConvergenceEngine, ThresholdState};
///
/// let mut engine = ConvergenceEngine::new(Thresholds::default());
/// let events = engine.observe(30, |_| "decoder".to_string());
/// let fired: Vec<u64> = events.iter().map(|e| *e.threshold()).collect();
/// assert_eq!(fired, vec![10, 25]);
/// assert!(engine.observe(30, |_| "decoder".to_string()).is_empty());
/// assert_eq!(engine.state_of(25, 30), Some(ThresholdState::Above));
/// assert_eq!(engine.state_of(50, 30), Some(ThresholdState::Below));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceEngine {
    thresholds: Thresholds,
    crossed: BTreeSet<u64>,
    events: Vec<ConvergenceEvent>,
}

impl ConvergenceEngine {
    /// Engine with nothing crossed.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            crossed: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    /// Engine resuming from recorded events.
    pub fn with_history(thresholds: Thresholds, events: Vec<ConvergenceEvent>) -> Self {
        let crossed = events.iter().map(|event| event.threshold).collect();
        Self {
            thresholds,
            crossed,
            events,
        }
    }

    /// Mark every uncrossed threshold at or below `total` as crossed.
    ///
    /// `trigger_for(threshold)` names the entry credited with the crossing.
    /// Returns the new events in ascending threshold order.
    pub fn observe(
        &mut self,
        total: u64,
        trigger_for: impl Fn(u64) -> String,
    ) -> Vec<ConvergenceEvent> {
        let now = Utc::now();
        let fresh: Vec<ConvergenceEvent> = self
            .thresholds
            .values()
            .iter()
            .copied()
            .filter(|t| *t <= total && !self.crossed.contains(t))
            .map(|t| ConvergenceEvent::new(t, total, now, trigger_for(t)))
            .collect();
        for event in &fresh {
            self.crossed.insert(event.threshold);
            info!(
                threshold = event.threshold,
                total,
                trigger = %event.trigger_entry,
                "Convergence threshold crossed"
            );
        }
        self.events.extend(fresh.iter().cloned());
        fresh
    }

    /// State of a configured threshold given the current total.
    ///
    /// `None` for a value that is not one of the thresholds.
    pub fn state_of(&self, threshold: u64, total: u64) -> Option<ThresholdState> {
        if !self.thresholds.values().contains(&threshold) {
            return None;
        }
        Some(if !self.crossed.contains(&threshold) {
            ThresholdState::Below
        } else if total == threshold {
            ThresholdState::At
        } else {
            ThresholdState::Above
        })
    }

    /// Whether a threshold has fired.
    pub fn is_crossed(&self, threshold: u64) -> bool {
        self.crossed.contains(&threshold)
    }

    /// Progress projection for a total.
    pub fn status(&self, total: u64) -> ConvergenceStatus {
        let next_threshold = self.thresholds.next_after(total);
        let progress_to_next = next_threshold
            .map(|next| total as f64 / next as f64)
            .unwrap_or(1.0);
        ConvergenceStatus {
            current_artifacts: total,
            next_threshold,
            progress_to_next,
            pattern_completion: total as f64 / self.thresholds.largest() as f64,
        }
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> &[ConvergenceEvent] {
        &self.events
    }

    /// Configured thresholds.
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }
}
