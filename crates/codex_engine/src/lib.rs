//! The Codex service.
//!
//! [`Codex`] wires the checkpoint log, the decision index and the artifact
//! registry into the per-turn pipeline: artifacts are validated and
//! classified, the checkpoint is appended, and every artifact is ingested
//! into the registry, which may fire convergence events. Canonization merges
//! one branch into another and re-ingests the artifacts it brings along.
//!
//! # Example
//!
//! ```
//! use codex_core::{ArtifactDraft, Thresholds};
//! use codex_engine::{Codex, Turn};
//!
//! let codex = Codex::new(Thresholds::default());
//! let story = codex.new_story(Some("noir_01"), "noir").unwrap();
//!
//! let turn = Turn::new("sha256:rain").with_artifact(ArtifactDraft::new("scanner", "scan the alley"));
//! let report = codex.continue_story(story.id(), "main", turn).unwrap();
//! assert!(report.created);
//! assert_eq!(report.assignments[0].variant, "scanner");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod codex;
mod merge;
mod persist;
mod turn;

pub use codex::{Codex, RestoredCheckpoint};
pub use merge::MergeReport;
pub use turn::{Turn, TurnBuilder, TurnReport};
