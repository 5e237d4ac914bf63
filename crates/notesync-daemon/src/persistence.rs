//! Persistence for sync records and daemon settings.
//!
//! Sync records are stored in `.notesync/records.json` within the vault
//! directory, loaded on startup and saved after each run. Settings live next
//! to them in `.notesync/settings.json`; the sync interval is re-read from
//! disk on every scheduler tick, so editing the file takes effect live.

use anyhow::Result;
use notesync_core::records::SyncRecord;
use notesync_core::scheduler::SyncConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const RECORDS_FILE: &str = ".notesync/records.json";
const SETTINGS_FILE: &str = ".notesync/settings.json";

/// Storage for persisted sync records.
pub struct RecordStorage {
    path: PathBuf,
}

impl RecordStorage {
    /// Storage under the given vault directory.
    pub fn new(vault_path: &Path) -> Self {
        Self {
            path: vault_path.join(RECORDS_FILE),
        }
    }

    /// Load records from disk. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<SyncRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        let records: Vec<SyncRecord> = serde_json::from_str(&data)?;
        debug!(count = records.len(), "Loaded sync records");
        Ok(records)
    }

    /// Save records to disk, creating the `.notesync` directory if needed.
    pub fn save(&self, records: &[SyncRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, data)?;
        debug!(count = records.len(), "Saved sync records");
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Settings {
    sync_interval_secs: i64,
}

/// Sync settings backed by a file, with a fallback from the command line.
///
/// `interval_secs` reads the settings file on every call; the scheduler
/// contract is that the configured value is never cached.
pub struct FileConfig {
    path: PathBuf,
    fallback_secs: i64,
}

impl FileConfig {
    pub fn new(vault_path: &Path, fallback_secs: i64) -> Self {
        Self {
            path: vault_path.join(SETTINGS_FILE),
            fallback_secs,
        }
    }
}

impl SyncConfig for FileConfig {
    fn interval_secs(&self) -> i64 {
        match fs::read_to_string(&self.path) {
            Ok(data) => match serde_json::from_str::<Settings>(&data) {
                Ok(settings) => settings.sync_interval_secs,
                Err(e) => {
                    warn!(error = %e, "Malformed settings file, using fallback interval");
                    self.fallback_secs
                }
            },
            Err(_) => self.fallback_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesync_core::records::SyncRecordStore;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = RecordStorage::new(dir.path());
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload_records() {
        let dir = TempDir::new().unwrap();
        let storage = RecordStorage::new(dir.path());

        let store = SyncRecordStore::new();
        store.enroll(1, "notes", "a.md");
        store.enroll(2, "archive", "b.md");
        storage.save(&store.snapshot()).unwrap();

        let reloaded = storage.load().unwrap();
        assert_eq!(reloaded, store.snapshot());
    }

    #[test]
    fn test_file_config_reads_live_value() {
        let dir = TempDir::new().unwrap();
        let config = FileConfig::new(dir.path(), 300);

        // No settings file: fallback
        assert_eq!(config.interval_secs(), 300);

        fs::create_dir_all(dir.path().join(".notesync")).unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"sync_interval_secs": 0}"#,
        )
        .unwrap();
        assert_eq!(config.interval_secs(), 0);

        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"sync_interval_secs": 60}"#,
        )
        .unwrap();
        assert_eq!(config.interval_secs(), 60);
    }
}
