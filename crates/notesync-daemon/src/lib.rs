//! notesync-daemon: runs the sync engine against a vault directory on disk.
//!
//! The daemon plays the host's role: it owns a JSON-backed note database, a
//! native filesystem, persisted sync records, and the markdown
//! exporter/importer collaborators the engine dispatches to.

pub mod collab;
pub mod native_fs;
pub mod note_store;
pub mod persistence;

pub use collab::{LogConflictResolver, LogProgress, MarkdownExporter, MarkdownImporter};
pub use native_fs::NativeFs;
pub use note_store::JsonNoteStore;
pub use persistence::{FileConfig, RecordStorage};
