//! Decision point index.

use crate::CheckpointLog;
use codex_core::{CheckpointId, DecisionPoint, Story, read_lock, write_lock};
use codex_error::{CodexResult, LogError, LogErrorKind};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::{Arc, RwLock};
use tracing::{info, instrument};

type Markers = BTreeMap<CheckpointId, DecisionPoint>;

/// Index of checkpoints marked as narrative fork origins.
///
/// One marker per checkpoint. Listings are snapshots taken when the listing
/// is requested.
#[derive(Debug, Default)]
pub struct DecisionIndex {
    markers: RwLock<Arc<Markers>>,
}

impl DecisionIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index from persisted markers.
    pub fn from_markers(markers: BTreeMap<CheckpointId, DecisionPoint>) -> Self {
        Self {
            markers: RwLock::new(Arc::new(markers)),
        }
    }

    /// Mark a checkpoint as a decision point.
    ///
    /// # Errors
    ///
    /// `AlreadyMarked` if the checkpoint carries a marker;
    /// `CheckpointNotFound` if the log has no such checkpoint; `InvalidInput`
    /// for an empty option list or an empty option label.
    #[instrument(skip(self, log, prompt, options), fields(checkpoint = %checkpoint.short()))]
    pub fn mark(
        &self,
        log: &CheckpointLog,
        checkpoint: &CheckpointId,
        prompt: &str,
        options: Vec<String>,
    ) -> CodexResult<DecisionPoint> {
        if options.is_empty() {
            return Err(LogError::new(LogErrorKind::InvalidInput(
                "a decision point needs at least one option".to_string(),
            ))
            .into());
        }
        if options.iter().any(|option| option.trim().is_empty()) {
            return Err(LogError::new(LogErrorKind::InvalidInput(
                "decision option labels must not be empty".to_string(),
            ))
            .into());
        }
        if !log.contains(checkpoint)? {
            return Err(
                LogError::new(LogErrorKind::CheckpointNotFound(checkpoint.to_string())).into(),
            );
        }

        let mut markers = write_lock(&self.markers, "decision index")?;
        if markers.contains_key(checkpoint) {
            return Err(LogError::new(LogErrorKind::AlreadyMarked(checkpoint.to_string())).into());
        }
        let decision = DecisionPoint::new(prompt, options);
        Arc::make_mut(&mut *markers).insert(checkpoint.clone(), decision.clone());
        info!(options = decision.options().len(), "Marked decision point");
        Ok(decision)
    }

    /// Marker on a checkpoint, if any.
    pub fn decision(&self, checkpoint: &CheckpointId) -> CodexResult<Option<DecisionPoint>> {
        Ok(read_lock(&self.markers, "decision index")?
            .get(checkpoint)
            .cloned())
    }

    /// Whether a checkpoint carries a marker.
    pub fn is_marked(&self, checkpoint: &CheckpointId) -> CodexResult<bool> {
        Ok(read_lock(&self.markers, "decision index")?.contains_key(checkpoint))
    }

    /// Every marked checkpoint, in ascending id order.
    pub fn list_forkable(&self) -> CodexResult<ForkPoints> {
        let markers = read_lock(&self.markers, "decision index")?.clone();
        Ok(ForkPoints::new(markers, None))
    }

    /// Marked checkpoints the story can reach, in ascending id order.
    pub fn list_forkable_in(&self, story: &Story) -> CodexResult<ForkPoints> {
        let markers = read_lock(&self.markers, "decision index")?.clone();
        Ok(ForkPoints::new(markers, Some(Arc::new(story.known().clone()))))
    }

    /// Markers on checkpoints the story can reach, for persistence.
    pub fn markers_for(&self, story: &Story) -> CodexResult<BTreeMap<CheckpointId, DecisionPoint>> {
        let markers = read_lock(&self.markers, "decision index")?;
        Ok(markers
            .iter()
            .filter(|(id, _)| story.knows(id))
            .map(|(id, decision)| (id.clone(), decision.clone()))
            .collect())
    }
}

/// Lazy, finite, restartable sequence of marked checkpoint ids.
///
/// Iterates a snapshot, so marks made after the listing was taken never
/// appear in it.
///
/// ```
/// use codex_log::{CheckpointLog, DecisionIndex};
///
/// let log = CheckpointLog::new();
/// log.create_story("noir", "noir").unwrap();
/// let root = log.append("noir", None, "sha256:intro", vec![]).unwrap().into_id();
///
/// let index = DecisionIndex::new();
/// index.mark(&log, &root, "Which door?", vec!["left".into(), "right".into()]).unwrap();
///
/// let mut forks = index.list_forkable().unwrap();
/// assert_eq!(forks.next(), Some(root.clone()));
/// assert_eq!(forks.next(), None);
/// forks.restart();
/// assert_eq!(forks.count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ForkPoints {
    markers: Arc<Markers>,
    scope: Option<Arc<BTreeSet<CheckpointId>>>,
    cursor: Option<CheckpointId>,
}

impl ForkPoints {
    fn new(markers: Arc<Markers>, scope: Option<Arc<BTreeSet<CheckpointId>>>) -> Self {
        Self {
            markers,
            scope,
            cursor: None,
        }
    }

    /// Rewind to the first id.
    pub fn restart(&mut self) {
        self.cursor = None;
    }
}

impl Iterator for ForkPoints {
    type Item = CheckpointId;

    fn next(&mut self) -> Option<Self::Item> {
        let scope = self.scope.as_deref();
        let admit = |id: &&CheckpointId| scope.is_none_or(|known| known.contains(*id));
        let found = match &self.cursor {
            None => self.markers.keys().find(admit).cloned(),
            Some(cursor) => self
                .markers
                .range::<CheckpointId, _>((Bound::Excluded(cursor), Bound::Unbounded))
                .map(|(id, _)| id)
                .find(admit)
                .cloned(),
        };
        if found.is_some() {
            self.cursor = found.clone();
        }
        found
    }
}
