//! Stories and branch references.

use crate::CheckpointId;
use chrono::{DateTime, Utc};
use codex_error::{MergeError, MergeErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the branch every story starts on.
pub const MAIN_BRANCH: &str = "main";

/// A named authoring session.
///
/// A story knows the set of checkpoints reachable from its history, its most
/// recently appended checkpoint (`head`) and its named branch pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Story {
    /// Stable slug id
    id: String,
    /// Genre tag as given
    genre: String,
    /// Creation time
    created_at: DateTime<Utc>,
    /// Most recently appended checkpoint
    head: Option<CheckpointId>,
    /// Branch name to checkpoint
    branches: BTreeMap<String, CheckpointId>,
    /// Every checkpoint this story can reach
    known: BTreeSet<CheckpointId>,
}

impl Story {
    /// Create an empty story.
    pub fn new(id: impl Into<String>, genre: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            genre: genre.into(),
            created_at,
            head: None,
            branches: BTreeMap::new(),
            known: BTreeSet::new(),
        }
    }

    /// Whether no checkpoint has been recorded or inherited yet.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Whether the checkpoint is part of this story's history.
    pub fn knows(&self, id: &CheckpointId) -> bool {
        self.known.contains(id)
    }

    /// Checkpoint a branch points at.
    pub fn branch(&self, name: &str) -> Option<&CheckpointId> {
        self.branches.get(name)
    }

    /// Record a checkpoint as part of this story's history.
    pub fn learn(&mut self, id: CheckpointId) {
        self.known.insert(id);
    }

    /// Move the head.
    pub fn set_head(&mut self, id: CheckpointId) {
        self.head = Some(id);
    }

    /// Point a branch at a checkpoint, creating it if needed.
    pub fn set_branch(&mut self, name: impl Into<String>, id: CheckpointId) {
        self.branches.insert(name.into(), id);
    }
}

/// Reference to a branch of a story, written `story` or `story:branch`.
///
/// # Examples
///
/// ```
/// use codex_core::BranchRef;
///
/// let r: BranchRef = "noir_01:alt".parse().unwrap();
/// assert_eq!(r.story(), "noir_01");
/// assert_eq!(r.branch(), "alt");
///
/// let main: BranchRef = "noir_01".parse().unwrap();
/// assert_eq!(main.branch(), "main");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_more::Display,
)]
#[display("{}:{}", story, branch)]
pub struct BranchRef {
    /// Story id
    story: String,
    /// Branch name
    branch: String,
}

impl BranchRef {
    /// Reference a named branch.
    pub fn new(story: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            story: story.into(),
            branch: branch.into(),
        }
    }

    /// Reference a story's `main` branch.
    pub fn main(story: impl Into<String>) -> Self {
        Self::new(story, MAIN_BRANCH)
    }
}

impl std::str::FromStr for BranchRef {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (story, branch) = s.split_once(':').unwrap_or((s, MAIN_BRANCH));
        if story.trim().is_empty() || branch.trim().is_empty() || branch.contains(':') {
            return Err(MergeError::new(MergeErrorKind::MalformedBranchRef(
                s.to_string(),
            )));
        }
        Ok(Self::new(story.trim(), branch.trim()))
    }
}
