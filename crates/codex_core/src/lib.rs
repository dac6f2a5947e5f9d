//! Core data types for the Codex.
//!
//! This crate provides the data model shared by the checkpoint log, the
//! artifact registry and the engine: identifiers, content hashing, name
//! slugging, stories, checkpoints, decision points, artifact records and the
//! pluggable category classifier.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod category;
mod checkpoint;
mod decision;
mod hash;
mod ids;
mod lock;
mod slug;
mod story;
mod threshold;

pub use artifact::{
    ArtifactDraft, ArtifactDraftBuilder, ArtifactRecord, PreparedArtifact, RecordKey,
};
pub use category::{Category, Classifier, KeywordClassifier};
pub use checkpoint::Checkpoint;
pub use decision::DecisionPoint;
pub use hash::{content_hash, content_ref, hash_fields, parse_content_ref};
pub use ids::{ArtifactId, CheckpointId};
pub use lock::{lock_mutex, read_lock, write_lock};
pub use slug::{session_story_id, slugify, story_tag};
pub use story::{BranchRef, MAIN_BRANCH, Story};
pub use threshold::{DEFAULT_THRESHOLDS, Thresholds};
