//! JSON-file-backed note database.
//!
//! Stands in for the host application's note storage: notes live in
//! `.notesync/notes.json` inside the vault directory, each with a content
//! string, a monotonically increasing version counter, and an optional
//! "open in editor" flag used by the active-editor exclusion.

use async_trait::async_trait;
use notesync_core::notes::{NoteError, NoteId, NoteStore, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

const NOTES_FILE: &str = ".notesync/notes.json";

/// One persisted note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredNote {
    pub id: NoteId,
    pub content: String,
    pub version: i64,
    /// True while the note is open and focused in an editor
    #[serde(default)]
    pub open_in_editor: bool,
}

/// Note store persisted as a JSON file.
pub struct JsonNoteStore {
    path: PathBuf,
    notes: RwLock<HashMap<NoteId, StoredNote>>,
}

impl JsonNoteStore {
    /// Open the note database inside the vault, creating an empty one if the
    /// file does not exist yet.
    pub fn open(vault_path: &Path) -> anyhow::Result<Self> {
        let path = vault_path.join(NOTES_FILE);
        let notes = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            let list: Vec<StoredNote> = serde_json::from_str(&data)?;
            list.into_iter().map(|n| (n.id, n)).collect()
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), count = notes.len(), "Opened note database");
        Ok(Self {
            path,
            notes: RwLock::new(notes),
        })
    }

    /// Ids of all notes in the database.
    pub fn all_ids(&self) -> Vec<NoteId> {
        let mut ids: Vec<NoteId> = self.notes.read().unwrap().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Insert or replace a note and persist.
    pub fn put(&self, note: StoredNote) -> anyhow::Result<()> {
        self.notes.write().unwrap().insert(note.id, note);
        self.save()
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut list: Vec<StoredNote> = self.notes.read().unwrap().values().cloned().collect();
        list.sort_by_key(|n| n.id);
        let data = serde_json::to_string_pretty(&list)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

#[async_trait]
impl NoteStore for JsonNoteStore {
    async fn content(&self, id: NoteId) -> Result<String> {
        self.notes
            .read()
            .unwrap()
            .get(&id)
            .map(|n| n.content.clone())
            .ok_or(NoteError::NotFound(id))
    }

    async fn version(&self, id: NoteId) -> Result<i64> {
        self.notes
            .read()
            .unwrap()
            .get(&id)
            .map(|n| n.version)
            .ok_or(NoteError::NotFound(id))
    }

    async fn set_content(&self, id: NoteId, content: &str) -> Result<()> {
        {
            let mut notes = self.notes.write().unwrap();
            let note = notes.get_mut(&id).ok_or(NoteError::NotFound(id))?;
            note.content = content.to_string();
            note.version += 1;
        }
        self.save().map_err(|e| NoteError::Store(e.to_string()))
    }

    async fn open_editor_ids(&self) -> Result<Vec<NoteId>> {
        Ok(self
            .notes
            .read()
            .unwrap()
            .values()
            .filter(|n| n.open_in_editor)
            .map(|n| n.id)
            .collect())
    }
}
