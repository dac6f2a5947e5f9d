//! Codex - branching story checkpoints with a global artifact registry.
//!
//! Stories are recorded turn by turn as an append-only, hash-identified DAG
//! of checkpoints. Artifacts generated along the way are ingested into one
//! global registry that resolves name collisions into canonical entries and
//! variants, and fires a one-time convergence event each time the global
//! artifact count crosses a milestone. Forked stories can be canonised back
//! into their origin.
//!
//! # Quick Start
//!
//! ```
//! use codex::{ArtifactDraft, BranchRef, Codex, Thresholds, Turn};
//!
//! let codex = Codex::new(Thresholds::default());
//! let story = codex.new_story(Some("noir_01"), "noir").unwrap();
//! let intro = codex
//!     .continue_story(story.id(), "main", Turn::new("sha256:rain"))
//!     .unwrap();
//!
//! codex.fork(story.id(), &intro.checkpoint, "noir_02", None).unwrap();
//! codex
//!     .continue_story(
//!         "noir_02",
//!         "main",
//!         Turn::new("sha256:docks").with_artifact(ArtifactDraft::new("scanner", "scan the docks")),
//!     )
//!     .unwrap();
//!
//! let report = codex.merge(&BranchRef::main("noir_02"), &BranchRef::main("noir_01")).unwrap();
//! assert_eq!(report.checkpoints_merged, 1);
//! ```
//!
//! # Architecture
//!
//! - `codex_error` - Error taxonomy and error classes
//! - `codex_core` - Ids, hashing, stories, checkpoints, artifacts, classifier
//! - `codex_log` - Checkpoint log and decision point index
//! - `codex_registry` - Artifact registry and convergence engine
//! - `codex_storage` - Persisted layout and blob store
//! - `codex_engine` - Turn pipeline and merge resolver
//!
//! This crate re-exports everything and adds configuration, logging setup and
//! the `codex` binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod observability;
mod workspace;

pub use codex_core::*;
pub use codex_engine::*;
pub use codex_error::*;
pub use codex_log::*;
pub use codex_registry::*;
pub use codex_storage::*;

pub use config::{CodexConfig, ConvergenceConfig, LoggingConfig};
pub use observability::init_logging;
pub use workspace::Workspace;
