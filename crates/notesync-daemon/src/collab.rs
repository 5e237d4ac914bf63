//! Collaborator implementations dispatched to by the engine.
//!
//! The exporter renders a note as frontmatter (version marker) plus the note
//! body; the importer copies a file's body back into the note. Rendering here
//! is plain passthrough: the daemon's notes already are markdown. Conflicts
//! are only surfaced, never resolved.

use async_trait::async_trait;
use notesync_core::engine::{
    BatchExporter, ConflictResolver, EngineError, NoteImporter, Result,
};
use notesync_core::frontmatter;
use notesync_core::fs::FileSystem;
use notesync_core::notes::{NoteId, NoteStore};
use notesync_core::progress::{ProgressHandle, ProgressReporter};
use notesync_core::records::SyncRecordStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Renders notes to markdown files, one batch per destination directory.
pub struct MarkdownExporter<F: FileSystem> {
    fs: F,
    notes: Arc<dyn NoteStore>,
    records: Arc<SyncRecordStore>,
}

impl<F: FileSystem> MarkdownExporter<F> {
    pub fn new(fs: F, notes: Arc<dyn NoteStore>, records: Arc<SyncRecordStore>) -> Self {
        Self { fs, notes, records }
    }
}

#[async_trait]
impl<F: FileSystem> BatchExporter for MarkdownExporter<F> {
    async fn export_batch(&self, directory: &str, note_ids: &[NoteId]) -> Result<()> {
        for id in note_ids {
            let record = self.records.get(*id).ok_or_else(|| EngineError::Export {
                directory: directory.to_string(),
                message: format!("note {} has no sync record", id),
            })?;
            let content = self.notes.content(*id).await?;
            let version = self.notes.version(*id).await?;
            let rendered = frontmatter::serialize(version, &content);
            self.fs
                .write(&record.file_path(), rendered.as_bytes())
                .await?;
            debug!(note_id = *id, path = %record.file_path(), "Exported note");
        }
        Ok(())
    }
}

/// Copies a file's body back into its note.
pub struct MarkdownImporter<F: FileSystem> {
    fs: F,
    notes: Arc<dyn NoteStore>,
}

impl<F: FileSystem> MarkdownImporter<F> {
    pub fn new(fs: F, notes: Arc<dyn NoteStore>) -> Self {
        Self { fs, notes }
    }
}

#[async_trait]
impl<F: FileSystem> NoteImporter for MarkdownImporter<F> {
    async fn import_file(&self, path: &str, note_id: NoteId) -> Result<()> {
        let bytes = self.fs.read(path).await?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let body = frontmatter::parse(&content).body;
        self.notes.set_content(note_id, &body).await?;
        debug!(note_id, path = %path, "Imported file into note");
        Ok(())
    }
}

/// Surfaces conflicts in the log and leaves both sides untouched. An
/// interactive host would open a diff view here instead.
#[derive(Debug, Default)]
pub struct LogConflictResolver;

#[async_trait]
impl ConflictResolver for LogConflictResolver {
    async fn on_conflict(&self, note_id: NoteId, file_path: &str) -> Result<()> {
        warn!(
            note_id,
            path = %file_path,
            "Note and file both changed since last sync; resolve manually"
        );
        Ok(())
    }
}

/// Progress reporter that writes lines to the log.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn begin(&self, title: &str) -> Box<dyn ProgressHandle> {
        Box::new(LogProgressHandle {
            title: title.to_string(),
        })
    }
}

struct LogProgressHandle {
    title: String,
}

impl ProgressHandle for LogProgressHandle {
    fn set_line(&mut self, text: &str, percent: u8) {
        info!("{}: {} ({}%)", self.title, text, percent);
    }

    fn close(self: Box<Self>, _after_ms: u64) {}
}
