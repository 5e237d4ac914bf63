//! Interval scheduler: recurring quiet background sync runs.
//!
//! One always-on timer per process lifetime. Each tick re-reads the current
//! configured interval instead of trusting the value captured at start, so
//! disabling sync in the host's settings takes effect without restarting.
//! The timer only cancels itself when the host process is torn down; an
//! in-flight run still finishes.

use crate::engine::{SyncEngine, SyncOptions, SyncReason, SyncReport};
use crate::fs::FileSystem;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Live view of the host's sync settings. Read on every tick, never cached.
pub trait SyncConfig: Send + Sync {
    /// Configured sync interval in seconds; zero or negative disables sync.
    fn interval_secs(&self) -> i64;
}

/// Host process state the scheduler gates on.
pub trait Host: Send + Sync {
    /// True once the host is tearing down. Terminal: the timer cancels itself.
    fn is_shut_down(&self) -> bool;

    /// True when the host window currently has input focus.
    fn window_focused(&self) -> bool;
}

pub struct Scheduler;

impl Scheduler {
    /// Install the recurring sync trigger with the given tick period.
    ///
    /// `after_run` is invoked with the report of every completed run (skipped
    /// ticks don't fire it); the daemon persists sync records there so a
    /// crash between ticks never loses a run's refreshed state.
    ///
    /// Returns `None` without spawning anything when `interval_secs <= 0`.
    /// Calling this twice installs two timers; callers avoid that.
    pub fn start<F: FileSystem + 'static>(
        engine: Arc<SyncEngine<F>>,
        config: Arc<dyn SyncConfig>,
        host: Arc<dyn Host>,
        interval_secs: i64,
        after_run: Box<dyn Fn(&SyncReport) + Send + Sync>,
    ) -> Option<JoinHandle<()>> {
        if interval_secs <= 0 {
            debug!(interval_secs, "Sync interval disabled, not scheduling");
            return None;
        }

        info!(interval_secs, "Starting sync scheduler");
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(Duration::from_secs(interval_secs as u64));
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; consume it so the first
            // real run happens one full interval after startup.
            timer.tick().await;

            loop {
                timer.tick().await;

                if host.is_shut_down() {
                    info!("Host shut down, stopping sync scheduler");
                    break;
                }

                // The interval may have been changed or disabled since the
                // timer started; re-read it and only run while positive.
                if config.interval_secs() <= 0 {
                    debug!("Sync interval disabled, skipping tick");
                    continue;
                }
                if !host.window_focused() {
                    debug!("Host window not focused, skipping tick");
                    continue;
                }

                let report = engine
                    .run_sync(
                        None,
                        SyncOptions {
                            quiet: true,
                            skip_active_editors: true,
                            reason: SyncReason::Auto,
                        },
                    )
                    .await;
                after_run(&report);
            }
        });

        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Checksum;
    use crate::engine::{
        BatchExporter, ConflictResolver, EngineError, NoteImporter, Result as EngineResult,
    };
    use crate::frontmatter;
    use crate::fs::InMemoryFs;
    use crate::notes::{InMemoryNoteStore, NoteId, NoteStore};
    use crate::progress::NoopProgress;
    use crate::records::{SyncRecord, SyncRecordStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

    struct FakeConfig(AtomicI64);

    impl SyncConfig for FakeConfig {
        fn interval_secs(&self) -> i64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    #[derive(Default)]
    struct FakeHost {
        shut_down: AtomicBool,
        focused: AtomicBool,
    }

    impl Host for FakeHost {
        fn is_shut_down(&self) -> bool {
            self.shut_down.load(Ordering::Relaxed)
        }

        fn window_focused(&self) -> bool {
            self.focused.load(Ordering::Relaxed)
        }
    }

    /// Exporter that renders through the shared fs and counts batches.
    struct CountingExporter {
        fs: Arc<InMemoryFs>,
        notes: Arc<InMemoryNoteStore>,
        records: Arc<SyncRecordStore>,
        batches: Mutex<usize>,
    }

    #[async_trait]
    impl BatchExporter for CountingExporter {
        async fn export_batch(&self, _directory: &str, note_ids: &[NoteId]) -> EngineResult<()> {
            *self.batches.lock().unwrap() += 1;
            for id in note_ids {
                let record = self.records.get(*id).unwrap();
                let content = self.notes.content(*id).await?;
                let version = self.notes.version(*id).await?;
                let rendered = frontmatter::serialize(version, &content);
                self.fs.write(&record.file_path(), rendered.as_bytes()).await?;
            }
            Ok(())
        }
    }

    struct FailImporter;

    #[async_trait]
    impl NoteImporter for FailImporter {
        async fn import_file(&self, path: &str, _note_id: NoteId) -> EngineResult<()> {
            Err(EngineError::Import {
                path: path.to_string(),
                message: "unexpected import in scheduler test".to_string(),
            })
        }
    }

    struct NoopResolver;

    #[async_trait]
    impl ConflictResolver for NoopResolver {
        async fn on_conflict(&self, _note_id: NoteId, _file_path: &str) -> EngineResult<()> {
            Ok(())
        }
    }

    struct Fixture {
        notes: Arc<InMemoryNoteStore>,
        exporter: Arc<CountingExporter>,
        engine: Arc<SyncEngine<Arc<InMemoryFs>>>,
        config: Arc<FakeConfig>,
        host: Arc<FakeHost>,
    }

    async fn fixture() -> Fixture {
        let fs = Arc::new(InMemoryFs::new());
        let notes = Arc::new(InMemoryNoteStore::new());
        let records = Arc::new(SyncRecordStore::new());

        // One enrolled, edited note so every run has work to do
        notes.put(1, "# A", 1);
        let rendered = frontmatter::serialize(1, "# A");
        fs.write("notes/a.md", rendered.as_bytes()).await.unwrap();
        records.upsert(SyncRecord {
            note_id: 1,
            directory: "notes".to_string(),
            filename: "a.md".to_string(),
            last_file_checksum: Checksum::of(&rendered),
            last_note_checksum: Checksum::of("# A"),
            last_synced_version: 1,
            last_synced_at: Utc::now(),
        });
        notes.set_content(1, "# A, edited").await.unwrap();

        let exporter = Arc::new(CountingExporter {
            fs: Arc::clone(&fs),
            notes: Arc::clone(&notes),
            records: Arc::clone(&records),
            batches: Mutex::new(0),
        });
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&fs),
            notes.clone() as Arc<dyn NoteStore>,
            records,
            exporter.clone() as Arc<dyn BatchExporter>,
            Arc::new(FailImporter),
            Arc::new(NoopResolver),
            Arc::new(NoopProgress),
        ));

        let host = Arc::new(FakeHost::default());
        host.focused.store(true, Ordering::Relaxed);

        Fixture {
            notes,
            exporter,
            engine,
            config: Arc::new(FakeConfig(AtomicI64::new(5))),
            host,
        }
    }

    #[tokio::test]
    async fn test_non_positive_interval_does_not_schedule() {
        let f = fixture().await;
        assert!(
            Scheduler::start(
                Arc::clone(&f.engine),
                f.config.clone(),
                f.host.clone(),
                0,
                Box::new(|_| {}),
            )
            .is_none()
        );
        assert!(
            Scheduler::start(
                Arc::clone(&f.engine),
                f.config.clone(),
                f.host.clone(),
                -30,
                Box::new(|_| {}),
            )
            .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_triggers_quiet_sync() {
        let f = fixture().await;
        let handle = Scheduler::start(
            Arc::clone(&f.engine),
            f.config.clone(),
            f.host.clone(),
            5,
            Box::new(|_| {}),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(*f.exporter.batches.lock().unwrap(), 1);

        // Edit again: the next tick picks it up
        f.notes.set_content(1, "# A, edited twice").await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*f.exporter.batches.lock().unwrap(), 2);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfocused_window_skips_tick() {
        let f = fixture().await;
        f.host.focused.store(false, Ordering::Relaxed);
        let handle = Scheduler::start(
            Arc::clone(&f.engine),
            f.config.clone(),
            f.host.clone(),
            5,
            Box::new(|_| {}),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(*f.exporter.batches.lock().unwrap(), 0);

        // Focus returns: syncing resumes
        f.host.focused.store(true, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(*f.exporter.batches.lock().unwrap(), 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_disabled_after_start_is_respected() {
        let f = fixture().await;
        let handle = Scheduler::start(
            Arc::clone(&f.engine),
            f.config.clone(),
            f.host.clone(),
            5,
            Box::new(|_| {}),
        )
        .unwrap();

        // Disable before the first tick fires: the timer keeps ticking but
        // never triggers
        f.config.0.store(0, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(*f.exporter.batches.lock().unwrap(), 0);

        // Re-enable without restarting the scheduler
        f.config.0.store(5, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(*f.exporter.batches.lock().unwrap(), 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_terminal() {
        let f = fixture().await;
        let handle = Scheduler::start(
            Arc::clone(&f.engine),
            f.config.clone(),
            f.host.clone(),
            5,
            Box::new(|_| {}),
        )
        .unwrap();

        f.host.shut_down.store(true, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(6)).await;

        // The task exited on its own (not aborted)
        handle.await.unwrap();
        assert_eq!(*f.exporter.batches.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_run_hook_fires_per_completed_run() {
        let f = fixture().await;
        let saves = Arc::new(AtomicUsize::new(0));
        let hook_saves = Arc::clone(&saves);
        let handle = Scheduler::start(
            Arc::clone(&f.engine),
            f.config.clone(),
            f.host.clone(),
            5,
            Box::new(move |_| {
                hook_saves.fetch_add(1, Ordering::Relaxed);
            }),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(saves.load(Ordering::Relaxed), 1);

        // Skipped ticks never fire the hook
        f.host.focused.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(saves.load(Ordering::Relaxed), 1);

        f.host.focused.store(true, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(saves.load(Ordering::Relaxed), 2);

        handle.abort();
    }
}
