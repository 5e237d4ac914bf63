//! notesync-daemon: syncs a JSON note database with markdown files in a
//! vault directory, either once or on an interval.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use notesync_core::engine::{SyncEngine, SyncOptions, SyncReport};
use notesync_core::notes::NoteStore;
use notesync_core::records::SyncRecordStore;
use notesync_core::scheduler::{Host, Scheduler};

use notesync_daemon::{
    FileConfig, JsonNoteStore, LogConflictResolver, LogProgress, MarkdownExporter,
    MarkdownImporter, NativeFs, RecordStorage,
};

#[derive(Parser, Debug)]
#[command(name = "notesync-daemon")]
#[command(about = "Sync notes to markdown files in a vault directory")]
struct Args {
    /// Path to the vault directory
    #[arg(short, long)]
    vault: PathBuf,

    /// Sync interval in seconds (0 disables scheduling). Overridden live by
    /// .notesync/settings.json when present.
    #[arg(long, default_value_t = 300)]
    interval: i64,

    /// Enroll every note not yet under sync into this directory before running
    #[arg(long)]
    enroll_all: Option<String>,

    /// Run one sync and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

/// Headless host: the window never loses focus, ctrl-c is the teardown.
#[derive(Default)]
struct DaemonHost {
    shut_down: AtomicBool,
}

impl Host for DaemonHost {
    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Relaxed)
    }

    fn window_focused(&self) -> bool {
        true
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let fs = Arc::new(NativeFs::new(args.vault.clone()));
    let notes = Arc::new(JsonNoteStore::open(&args.vault)?);
    let storage = RecordStorage::new(&args.vault);
    let records = Arc::new(SyncRecordStore::from_records(storage.load()?));

    if let Some(directory) = &args.enroll_all {
        for id in notes.all_ids() {
            if !records.contains(id) {
                records.enroll(id, directory, &format!("note-{}.md", id));
                info!(note_id = id, directory = %directory, "Enrolled note");
            }
        }
    }

    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&fs),
        Arc::clone(&notes) as Arc<dyn NoteStore>,
        Arc::clone(&records),
        Arc::new(MarkdownExporter::new(
            Arc::clone(&fs),
            Arc::clone(&notes) as Arc<dyn NoteStore>,
            Arc::clone(&records),
        )),
        Arc::new(MarkdownImporter::new(
            Arc::clone(&fs),
            Arc::clone(&notes) as Arc<dyn NoteStore>,
        )),
        Arc::new(LogConflictResolver),
        Arc::new(LogProgress),
    ));

    // One manual run up front so a fresh vault is populated immediately
    engine.run_sync(None, SyncOptions::default()).await;
    storage.save(&records.snapshot())?;

    if args.once {
        return Ok(());
    }

    let config = Arc::new(FileConfig::new(&args.vault, args.interval));
    let host = Arc::new(DaemonHost::default());
    // Persist after every scheduled run, so a hard crash between ticks never
    // resurrects stale records.
    let save_after_run = {
        let records = Arc::clone(&records);
        let storage = RecordStorage::new(&args.vault);
        move |_report: &SyncReport| {
            if let Err(e) = storage.save(&records.snapshot()) {
                warn!(error = %e, "Failed to save sync records");
            }
        }
    };
    let Some(handle) = Scheduler::start(
        Arc::clone(&engine),
        config,
        Arc::clone(&host) as Arc<dyn Host>,
        args.interval,
        Box::new(save_after_run),
    ) else {
        info!("Scheduling disabled, nothing left to do");
        return Ok(());
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    host.shut_down.store(true, Ordering::Relaxed);
    // The timer is only a trigger; cancel it instead of waiting out the tick.
    handle.abort();
    storage.save(&records.snapshot())?;
    Ok(())
}
