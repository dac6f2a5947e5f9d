//! Persistence for the Codex.
//!
//! The persisted layout is abstract: one checkpoint-log document per story
//! keyed by story id, one global registry document, and the append-only list
//! of emitted convergence events. [`CodexStore`] is the contract; this crate
//! ships a filesystem backend and an in-memory backend.
//!
//! A session that rewrites the documents holds a [`DirectoryLock`] on the
//! root, so overlapping sessions are rejected rather than interleaved.
//!
//! Narrative payloads and artifact bodies live in a separate content-addressed
//! [`BlobStore`], referenced from checkpoints and records as `sha256:<hash>`.
//!
//! # Filesystem layout
//!
//! ```text
//! <root>/
//! ├── stories/
//! │   └── <story id>.json
//! ├── registry.json
//! ├── events.json
//! ├── codex.lock
//! └── blobs/
//!     └── ab/
//!         └── cd/
//!             └── abcdef0123...
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod blob;
mod filesystem;
mod io;
mod lock;
mod memory;
mod store;

pub use blob::BlobStore;
pub use filesystem::FileSystemStore;
pub use lock::DirectoryLock;
pub use memory::MemoryStore;
pub use store::CodexStore;
