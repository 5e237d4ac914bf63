//! Three-way change detection for one note.
//!
//! Compares the note's current state and the file's current state against the
//! checksums recorded at last sync, and decides which side moved:
//!
//! - note changed, file unchanged -> the file is stale, re-export
//! - file changed, note unchanged -> the note is stale, import
//! - both changed (or the file header is unreadable) -> a human must decide
//!
//! Classification is a pure function over already-fetched state, so it can be
//! called concurrently for different notes without coordination.

use crate::checksum::Checksum;
use crate::records::SyncRecord;

/// Version marker parsed from the file's frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMeta {
    /// Frontmatter declares a valid (non-negative) version marker
    Version(i64),
    /// No frontmatter, or no version key
    Absent,
    /// Frontmatter present but the marker is negative or malformed
    Unreadable,
}

/// Current state of the file side, as read from disk.
#[derive(Debug, Clone)]
pub struct FileStatus {
    /// Raw file content (frontmatter included; it feeds the checksum)
    pub content: String,
    pub meta: FileMeta,
}

/// Which side of a sync pair is ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOutcome {
    /// Neither side changed since last sync
    UpToDate,
    /// Note changed, file did not: export
    NoteAhead,
    /// File changed, note did not: import
    FileAhead,
    /// Both changed, or the file is unreadable: hand off to conflict resolution
    NeedsResolution,
}

/// Classify one note against its sync record.
///
/// `file` is `None` when no file exists at the recorded path; a missing file
/// always means the note must be (re)written, regardless of note content.
///
/// Beyond checksums, the note counts as changed when its current version
/// counter differs from the file's declared marker. This catches edits that
/// arrived through the host's own remote sync without updating our recorded
/// checksum. The check can false-positive when the host account is not
/// authenticated and version counters drift; that tradeoff is accepted.
pub fn classify(
    record: &SyncRecord,
    file: Option<&FileStatus>,
    note_content: &str,
    note_version: i64,
) -> CompareOutcome {
    let Some(file) = file else {
        return CompareOutcome::NoteAhead;
    };

    if file.meta == FileMeta::Unreadable {
        return CompareOutcome::NeedsResolution;
    }

    let file_changed = Checksum::of(&file.content) != record.last_file_checksum;

    let mut note_changed = Checksum::of(note_content) != record.last_note_checksum;
    if let FileMeta::Version(marker) = file.meta {
        if marker != note_version {
            note_changed = true;
        }
    }

    match (note_changed, file_changed) {
        (true, true) => CompareOutcome::NeedsResolution,
        (true, false) => CompareOutcome::NoteAhead,
        (false, true) => CompareOutcome::FileAhead,
        (false, false) => CompareOutcome::UpToDate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const NOTE: &str = "# My Note\n\nBody.";
    const FILE: &str = "---\nversion: 5\n---\n\n# My Note\n\nBody.";

    fn record() -> SyncRecord {
        SyncRecord {
            note_id: 1,
            directory: "notes".to_string(),
            filename: "a.md".to_string(),
            last_file_checksum: Checksum::of(FILE),
            last_note_checksum: Checksum::of(NOTE),
            last_synced_version: 5,
            last_synced_at: Utc::now(),
        }
    }

    fn file(content: &str, meta: FileMeta) -> FileStatus {
        FileStatus {
            content: content.to_string(),
            meta,
        }
    }

    #[test]
    fn test_unchanged_is_up_to_date() {
        let outcome = classify(&record(), Some(&file(FILE, FileMeta::Version(5))), NOTE, 5);
        assert_eq!(outcome, CompareOutcome::UpToDate);
    }

    #[test]
    fn test_missing_file_is_note_ahead() {
        // Regardless of note content matching the record
        assert_eq!(classify(&record(), None, NOTE, 5), CompareOutcome::NoteAhead);
        assert_eq!(
            classify(&record(), None, "completely different", 99),
            CompareOutcome::NoteAhead
        );
    }

    #[test]
    fn test_note_changed_is_note_ahead() {
        let outcome = classify(
            &record(),
            Some(&file(FILE, FileMeta::Version(5))),
            "# My Note\n\nEdited body.",
            5,
        );
        assert_eq!(outcome, CompareOutcome::NoteAhead);
    }

    #[test]
    fn test_file_changed_is_file_ahead() {
        let edited = "---\nversion: 5\n---\n\n# My Note\n\nEdited on disk.";
        let outcome = classify(&record(), Some(&file(edited, FileMeta::Version(5))), NOTE, 5);
        assert_eq!(outcome, CompareOutcome::FileAhead);
    }

    #[test]
    fn test_both_changed_needs_resolution() {
        let edited = "---\nversion: 5\n---\n\n# My Note\n\nEdited on disk.";
        let outcome = classify(
            &record(),
            Some(&file(edited, FileMeta::Version(5))),
            "# My Note\n\nEdited in app.",
            5,
        );
        assert_eq!(outcome, CompareOutcome::NeedsResolution);
    }

    #[test]
    fn test_unreadable_meta_needs_resolution_even_when_checksums_match() {
        let outcome = classify(&record(), Some(&file(FILE, FileMeta::Unreadable)), NOTE, 5);
        assert_eq!(outcome, CompareOutcome::NeedsResolution);
    }

    #[test]
    fn test_version_drift_counts_as_note_change() {
        // Checksums both match, but the note's version counter moved past the
        // file's marker (e.g. host remote sync restored an older snapshot).
        let outcome = classify(&record(), Some(&file(FILE, FileMeta::Version(5))), NOTE, 6);
        assert_eq!(outcome, CompareOutcome::NoteAhead);
    }

    #[test]
    fn test_version_drift_with_file_change_needs_resolution() {
        let edited = "---\nversion: 5\n---\n\n# My Note\n\nEdited on disk.";
        let outcome = classify(&record(), Some(&file(edited, FileMeta::Version(5))), NOTE, 6);
        assert_eq!(outcome, CompareOutcome::NeedsResolution);
    }

    #[test]
    fn test_absent_meta_skips_version_check() {
        let outcome = classify(&record(), Some(&file(FILE, FileMeta::Absent)), NOTE, 6);
        assert_eq!(outcome, CompareOutcome::UpToDate);
    }
}
