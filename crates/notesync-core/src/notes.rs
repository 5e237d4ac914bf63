//! NoteStore trait: the host application's note database.
//!
//! The engine never touches note storage directly; it reads content and the
//! monotonically increasing version counter through this trait, and writes
//! imported content back through it. The host also answers which notes are
//! currently open and focused in an editor, so a background run can avoid
//! clobbering a note mid-edit.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use thiserror::Error;

/// Stable identifier assigned to a note by the host application.
pub type NoteId = i64;

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("Note not found: {0}")]
    NotFound(NoteId),

    #[error("Note store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, NoteError>;

/// Abstract access to the host's note storage.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Current content of the note.
    async fn content(&self, id: NoteId) -> Result<String>;

    /// Current version counter of the note.
    async fn version(&self, id: NoteId) -> Result<i64>;

    /// Overwrite the note's content (bumps the version counter).
    async fn set_content(&self, id: NoteId, content: &str) -> Result<()>;

    /// Ids of notes currently open and focused in an editor.
    async fn open_editor_ids(&self) -> Result<Vec<NoteId>>;
}

#[derive(Debug, Clone)]
struct FakeNote {
    content: String,
    version: i64,
}

/// In-memory note store for testing.
#[derive(Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<HashMap<NoteId, FakeNote>>,
    open_editors: RwLock<HashSet<NoteId>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a note with an explicit version.
    pub fn put(&self, id: NoteId, content: &str, version: i64) {
        self.notes.write().unwrap().insert(
            id,
            FakeNote {
                content: content.to_string(),
                version,
            },
        );
    }

    /// Mark a note as open and focused in an editor.
    pub fn open_editor(&self, id: NoteId) {
        self.open_editors.write().unwrap().insert(id);
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
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
        let mut notes = self.notes.write().unwrap();
        let note = notes.get_mut(&id).ok_or(NoteError::NotFound(id))?;
        note.content = content.to_string();
        note.version += 1;
        Ok(())
    }

    async fn open_editor_ids(&self) -> Result<Vec<NoteId>> {
        Ok(self.open_editors.read().unwrap().iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_content_bumps_version() {
        let store = InMemoryNoteStore::new();
        store.put(1, "original", 3);

        store.set_content(1, "edited").await.unwrap();

        assert_eq!(store.content(1).await.unwrap(), "edited");
        assert_eq!(store.version(1).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_missing_note_is_not_found() {
        let store = InMemoryNoteStore::new();
        assert!(matches!(
            store.content(99).await,
            Err(NoteError::NotFound(99))
        ));
    }
}
