//! notesync-core: Bidirectional sync engine between host-managed notes and
//! markdown files on disk.
//!
//! This crate provides the core functionality for:
//! - Three-way change detection (note state vs file state vs last-synced state)
//! - The single-flight sync orchestrator with batched, ordered dispatch
//! - Persistent sync records (checksums + version counters per note)
//! - An interval scheduler that triggers quiet background runs
//! - FileSystem, NoteStore, and collaborator trait abstractions

pub mod checksum;
pub mod compare;
pub mod engine;
pub mod frontmatter;
pub mod fs;
pub mod notes;
pub mod progress;
pub mod records;
pub mod scheduler;

pub use checksum::Checksum;
pub use compare::{CompareOutcome, FileMeta, FileStatus};
pub use engine::{
    BatchExporter, ConflictResolver, NoteImporter, SyncEngine, SyncOptions, SyncReason, SyncReport,
};
pub use fs::{FileSystem, InMemoryFs};
pub use notes::{InMemoryNoteStore, NoteId, NoteStore};
pub use progress::{NoopProgress, ProgressHandle, ProgressReporter};
pub use records::{SyncRecord, SyncRecordStore};
pub use scheduler::{Host, Scheduler, SyncConfig};
