//! Checkpoint log and decision point index.
//!
//! The log is an arena of immutable checkpoint nodes addressed by content
//! hash, with parent pointers and a separate child index. Stories are named
//! views over the arena: each knows which nodes it can reach and keeps named
//! branch pointers into the DAG. Branching never copies nodes.
//!
//! # Example
//!
//! ```
//! use codex_log::CheckpointLog;
//!
//! let log = CheckpointLog::new();
//! log.create_story("noir_01", "noir").unwrap();
//!
//! let root = log.append("noir_01", None, "sha256:intro", vec![]).unwrap();
//! let retry = log.append("noir_01", None, "sha256:intro", vec![]).unwrap();
//! assert_eq!(root.id(), retry.id());
//! assert!(!retry.is_new());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod decision;
mod dag;
mod snapshot;

pub use decision::{DecisionIndex, ForkPoints};
pub use dag::{Appended, CheckpointLog};
pub use snapshot::StoryLog;
