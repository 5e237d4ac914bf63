//! Sync records: persisted per-note state from the last successful sync.
//!
//! A note is "under sync" iff a record exists for it. Records are created
//! when a note is first enrolled (export-with-sync), updated by the engine
//! after every successful export or import, and only removed by an explicit
//! unenroll action.

use crate::checksum::Checksum;
use crate::notes::NoteId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Persisted sync state for one note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRecord {
    /// The note this record tracks (unique key)
    pub note_id: NoteId,
    /// Destination directory of the exported file
    pub directory: String,
    /// Filename within the directory
    pub filename: String,
    /// Checksum of the file content at last sync
    pub last_file_checksum: Checksum,
    /// Checksum of the note content at last sync
    pub last_note_checksum: Checksum,
    /// The note's version counter at last sync
    pub last_synced_version: i64,
    /// When the last successful sync happened
    pub last_synced_at: DateTime<Utc>,
}

impl SyncRecord {
    /// Full path of the synced file.
    pub fn file_path(&self) -> String {
        if self.directory.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.directory.trim_end_matches('/'), self.filename)
        }
    }
}

/// In-memory store of sync records, keyed by note id.
///
/// The only shared mutable state besides the engine's in-flight flag. The
/// engine updates a record only after a successful action on that note, and
/// the single-flight guard keeps runs from interleaving.
#[derive(Default)]
pub struct SyncRecordStore {
    records: RwLock<HashMap<NoteId, SyncRecord>>,
}

impl SyncRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously persisted records.
    pub fn from_records(records: Vec<SyncRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.note_id, r)).collect();
        Self {
            records: RwLock::new(map),
        }
    }

    /// Enroll a note into sync (the explicit export-with-sync action).
    ///
    /// The fresh record carries empty-content checksums, so the next run
    /// classifies the note as ahead and writes the file.
    pub fn enroll(&self, id: NoteId, directory: &str, filename: &str) -> SyncRecord {
        let record = SyncRecord {
            note_id: id,
            directory: directory.to_string(),
            filename: filename.to_string(),
            last_file_checksum: Checksum::of(""),
            last_note_checksum: Checksum::of(""),
            last_synced_version: 0,
            last_synced_at: Utc::now(),
        };
        self.upsert(record.clone());
        record
    }

    /// Get the record for a note, if it is under sync.
    pub fn get(&self, id: NoteId) -> Option<SyncRecord> {
        self.records.read().unwrap().get(&id).cloned()
    }

    /// Insert or replace the record for a note.
    pub fn upsert(&self, record: SyncRecord) {
        self.records
            .write()
            .unwrap()
            .insert(record.note_id, record);
    }

    /// Remove a note's record (explicit unenroll).
    pub fn remove(&self, id: NoteId) -> Option<SyncRecord> {
        self.records.write().unwrap().remove(&id)
    }

    /// Whether a note is under sync.
    pub fn contains(&self, id: NoteId) -> bool {
        self.records.read().unwrap().contains_key(&id)
    }

    /// Ids of all notes currently under sync.
    pub fn all_note_ids(&self) -> Vec<NoteId> {
        let mut ids: Vec<NoteId> = self.records.read().unwrap().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    /// All records, for persistence.
    pub fn snapshot(&self) -> Vec<SyncRecord> {
        let mut records: Vec<SyncRecord> =
            self.records.read().unwrap().values().cloned().collect();
        records.sort_by_key(|r| r.note_id);
        records
    }
}
