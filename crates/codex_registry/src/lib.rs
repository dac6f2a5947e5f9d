//! Global artifact registry and convergence engine.
//!
//! The registry deduplicates artifacts contributed by every story into
//! registry entries, resolving name collisions into globally unique variant
//! names. Resolution is defined over the set of ingested records in
//! `(story id, checkpoint id, slug)` order, so the final state does not depend
//! on arrival order.
//!
//! The convergence engine watches the total artifact count and records one
//! event per threshold crossing for the lifetime of the registry.
//!
//! # Example
//!
//! ```
//! use codex_core::{ArtifactDraft, CheckpointId, KeywordClassifier, Thresholds};
//! use codex_registry::Registry;
//!
//! let registry = Registry::new(Thresholds::default());
//! let record = ArtifactDraft::new("scanner", "scan the grid")
//!     .prepare(&KeywordClassifier::default())
//!     .unwrap()
//!     .attach("story_a", CheckpointId::from("c1"), "cyberpunk");
//!
//! let outcome = registry.ingest(record).unwrap();
//! assert_eq!(outcome.entry_id, "scanner");
//! assert_eq!(outcome.variant, "scanner");
//! assert_eq!(registry.total().unwrap(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod convergence;
mod entry;
mod outcome;
mod query;
mod registry;
mod resonance;
mod state;

pub use convergence::{ConvergenceEngine, ConvergenceEvent, ConvergenceStatus, ThresholdState};
pub use entry::{ArtifactVersion, Contributor, RegistryEntry};
pub use outcome::{Assignment, BatchOutcome, IngestOutcome, VariantRename};
pub use query::{ArtifactFilter, EntryMatches};
pub use registry::{Registry, RegistryDocument};
pub use resonance::{COMPATIBLE_PAIRS, Resonance};
pub use state::RegistrySnapshot;
