//! SyncEngine: the single-flight sync orchestrator.
//!
//! One run works as follows:
//!
//! 1. Acquire the process-wide in-flight flag; a concurrent caller gets a
//!    silent no-op, never queued.
//! 2. Resolve the candidate set (explicit list filtered to enrolled notes, or
//!    every note under sync), optionally dropping notes open in an editor.
//! 3. Compare every candidate against its sync record (read-only pass) and
//!    partition into exports (grouped by destination directory), imports, and
//!    conflicts.
//! 4. Dispatch in fixed order: batched exports, then imports (each followed by
//!    a single-note re-export so the file reflects the note's authoritative
//!    post-import state), then conflict hand-offs. Records are refreshed after
//!    each successful action.
//!
//! Any error aborts the remainder of the run; it is logged and swallowed, the
//! flag is released by a drop guard, and untouched records let the next run
//! re-attempt from current state.

use crate::checksum::Checksum;
use crate::compare::{CompareOutcome, FileStatus, classify};
use crate::frontmatter;
use crate::fs::{FileSystem, FsError};
use crate::notes::{NoteError, NoteId, NoteStore};
use crate::progress::{NoopProgress, ProgressReporter};
use crate::records::{SyncRecord, SyncRecordStore};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),

    #[error("Note store error: {0}")]
    Note(#[from] NoteError),

    #[error("Export to {directory} failed: {message}")]
    Export { directory: String, message: String },

    #[error("Import of {path} failed: {message}")]
    Import { path: String, message: String },

    #[error("Conflict hook failed for note {note_id}: {message}")]
    Conflict { note_id: NoteId, message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Writes/updates the files for a group of notes in one destination directory.
///
/// How note content becomes markdown is the implementor's business; the engine
/// only cares that the files exist afterwards so it can refresh checksums.
#[async_trait]
pub trait BatchExporter: Send + Sync {
    async fn export_batch(&self, directory: &str, note_ids: &[NoteId]) -> Result<()>;
}

/// Overwrites a note's content from its file.
#[async_trait]
pub trait NoteImporter: Send + Sync {
    async fn import_file(&self, path: &str, note_id: NoteId) -> Result<()>;
}

/// Invoked per conflicting note. Typically opens an interactive diff view;
/// the engine awaits it but never resolves conflicts itself.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn on_conflict(&self, note_id: NoteId, file_path: &str) -> Result<()>;
}

/// Why a sync run was triggered. Logging/diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReason {
    Manual,
    Auto,
    Export,
}

impl std::fmt::Display for SyncReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncReason::Manual => f.write_str("manual"),
            SyncReason::Auto => f.write_str("auto"),
            SyncReason::Export => f.write_str("export"),
        }
    }
}

/// Options for one sync run.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Suppress progress reporting
    pub quiet: bool,
    /// Exclude notes currently open and focused in an editor
    pub skip_active_editors: bool,
    pub reason: SyncReason,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            quiet: false,
            skip_active_editors: false,
            reason: SyncReason::Manual,
        }
    }
}

/// What a run did. Purely informational; errors never propagate to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// False when the run was rejected because another was in flight
    pub ran: bool,
    /// True when an error aborted the run partway
    pub failed: bool,
    pub compared: usize,
    pub exported: usize,
    pub imported: usize,
    pub conflicts: usize,
    /// Notes excluded because they were open in an editor
    pub skipped: usize,
}

impl SyncReport {
    /// Notes whose file or note content was actually written.
    pub fn synced(&self) -> usize {
        self.exported + self.imported
    }
}

/// Releases the in-flight flag on every exit path, including panics.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The sync orchestrator. One instance per process; all collaborators are
/// injected so tests can substitute fakes.
pub struct SyncEngine<F: FileSystem> {
    fs: F,
    notes: Arc<dyn NoteStore>,
    records: Arc<SyncRecordStore>,
    exporter: Arc<dyn BatchExporter>,
    importer: Arc<dyn NoteImporter>,
    conflicts: Arc<dyn ConflictResolver>,
    progress: Arc<dyn ProgressReporter>,
    in_flight: AtomicBool,
}

impl<F: FileSystem> SyncEngine<F> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fs: F,
        notes: Arc<dyn NoteStore>,
        records: Arc<SyncRecordStore>,
        exporter: Arc<dyn BatchExporter>,
        importer: Arc<dyn NoteImporter>,
        conflicts: Arc<dyn ConflictResolver>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            fs,
            notes,
            records,
            exporter,
            importer,
            conflicts,
            progress,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one sync pass. Never raises: errors are logged and reflected in
    /// the report, and a run already in flight makes this a silent no-op.
    pub async fn run_sync(&self, note_ids: Option<Vec<NoteId>>, opts: SyncOptions) -> SyncReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(reason = %opts.reason, "Sync already in flight, skipping");
            return SyncReport::default();
        }
        let _guard = InFlightGuard(&self.in_flight);

        let mut report = SyncReport {
            ran: true,
            ..SyncReport::default()
        };
        if let Err(e) = self.run_sync_inner(note_ids, &opts, &mut report).await {
            error!(
                reason = %opts.reason,
                skipped = report.skipped,
                error = %e,
                "Sync run aborted"
            );
            report.failed = true;
        }
        report
    }

    async fn run_sync_inner(
        &self,
        note_ids: Option<Vec<NoteId>>,
        opts: &SyncOptions,
        report: &mut SyncReport,
    ) -> Result<()> {
        // Resolve candidates: explicit list filtered to enrolled notes, or
        // everything under sync.
        let mut candidates: Vec<NoteId> = match note_ids {
            Some(ids) => ids
                .into_iter()
                .filter(|id| self.records.contains(*id))
                .collect(),
            None => self.records.all_note_ids(),
        };

        if opts.skip_active_editors {
            let open: HashSet<NoteId> = self.notes.open_editor_ids().await?.into_iter().collect();
            let before = candidates.len();
            candidates.retain(|id| !open.contains(id));
            report.skipped = before - candidates.len();
            if report.skipped > 0 {
                debug!(skipped = report.skipped, "Excluded notes open in editors");
            }
        }

        if candidates.is_empty() {
            debug!(reason = %opts.reason, "Nothing to sync");
            return Ok(());
        }

        let reporter: &dyn ProgressReporter = if opts.quiet {
            &NoopProgress
        } else {
            self.progress.as_ref()
        };
        let mut progress = reporter.begin(&format!("Syncing notes ({})", opts.reason));

        // Comparison pass: read-only, entirely before any dispatch.
        let total = candidates.len();
        let mut to_export: BTreeMap<String, Vec<NoteId>> = BTreeMap::new();
        let mut to_import: Vec<SyncRecord> = Vec::new();
        let mut to_resolve: Vec<SyncRecord> = Vec::new();

        for (i, id) in candidates.iter().enumerate() {
            // Records are only mutated by this engine under the in-flight
            // flag, so the snapshot taken here stays valid for dispatch.
            let Some(record) = self.records.get(*id) else {
                continue;
            };
            let outcome = self.compare(&record).await?;
            report.compared += 1;
            debug!(note_id = *id, outcome = ?outcome, "Compared");
            match outcome {
                CompareOutcome::UpToDate => {}
                CompareOutcome::NoteAhead => to_export
                    .entry(record.directory.clone())
                    .or_default()
                    .push(*id),
                CompareOutcome::FileAhead => to_import.push(record),
                CompareOutcome::NeedsResolution => to_resolve.push(record),
            }
            progress.set_line(
                &format!("Comparing {}/{}", i + 1, total),
                percent(i + 1, total),
            );
        }

        // Dispatch in fixed order: exports, then imports, then resolution.
        // Imports re-derive file metadata that a later export would overwrite
        // stale, and resolution should see the latest state of both sides.
        let actions = to_export.values().map(Vec::len).sum::<usize>()
            + to_import.len()
            + to_resolve.len();
        let mut done = 0usize;

        for (directory, ids) in &to_export {
            debug!(directory = %directory, count = ids.len(), "Exporting batch");
            self.exporter.export_batch(directory, ids).await?;
            for id in ids {
                self.refresh_record(*id).await?;
                report.exported += 1;
                done += 1;
                progress.set_line(
                    &format!("Exporting {}/{}", done, actions),
                    percent(done, actions),
                );
            }
        }

        for record in &to_import {
            let path = record.file_path();
            debug!(note_id = record.note_id, path = %path, "Importing file");
            self.importer.import_file(&path, record.note_id).await?;
            // The file must reflect the note's post-import state (normalized
            // formatting, fresh version marker), so re-export just this note.
            self.exporter
                .export_batch(&record.directory, &[record.note_id])
                .await?;
            self.refresh_record(record.note_id).await?;
            report.imported += 1;
            done += 1;
            progress.set_line(
                &format!("Importing {}/{}", done, actions),
                percent(done, actions),
            );
        }

        for record in &to_resolve {
            let path = record.file_path();
            info!(note_id = record.note_id, path = %path, "Both sides changed, handing off");
            self.conflicts.on_conflict(record.note_id, &path).await?;
            report.conflicts += 1;
            done += 1;
            progress.set_line(
                &format!("Resolving {}/{}", done, actions),
                percent(done, actions),
            );
        }

        if report.synced() == 0 && report.conflicts == 0 {
            progress.set_line("Everything is up to date", 100);
        } else {
            progress.set_line(
                &format!("Synced {} notes, skipped {}", report.synced(), report.skipped),
                100,
            );
        }
        progress.close(3_000);

        info!(
            reason = %opts.reason,
            synced = report.synced(),
            conflicts = report.conflicts,
            skipped = report.skipped,
            "Sync finished"
        );
        Ok(())
    }

    /// Compare one enrolled note against its record. Read-only and safe to
    /// call concurrently for different notes.
    pub async fn compare(&self, record: &SyncRecord) -> Result<CompareOutcome> {
        let file = self.read_file_status(&record.file_path()).await?;
        let note_content = self.notes.content(record.note_id).await?;
        let note_version = self.notes.version(record.note_id).await?;
        Ok(classify(record, file.as_ref(), &note_content, note_version))
    }

    async fn read_file_status(&self, path: &str) -> Result<Option<FileStatus>> {
        // Read directly instead of probing exists() first: a file deleted
        // between the two calls must classify as missing, not abort the run.
        let bytes = match self.fs.read(path).await {
            Ok(bytes) => bytes,
            Err(FsError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let meta = frontmatter::parse(&content).meta;
        Ok(Some(FileStatus { content, meta }))
    }

    /// Re-read both sides after a successful action and store fresh checksums
    /// and version, so the next compare sees this state as the baseline.
    async fn refresh_record(&self, id: NoteId) -> Result<()> {
        let Some(mut record) = self.records.get(id) else {
            return Ok(());
        };
        let note_content = self.notes.content(id).await?;
        let note_version = self.notes.version(id).await?;
        let file_bytes = self.fs.read(&record.file_path()).await?;
        let file_content = String::from_utf8_lossy(&file_bytes).into_owned();

        record.last_note_checksum = Checksum::of(&note_content);
        record.last_file_checksum = Checksum::of(&file_content);
        record.last_synced_version = note_version;
        record.last_synced_at = Utc::now();
        self.records.upsert(record);
        Ok(())
    }
}

fn percent(done: usize, total: usize) -> u8 {
    ((done * 100) / total.max(1)) as u8
}
