//! Scanner module — orchestrates one inventory run.
//!
//! A run has three phases that never overlap on the store:
//!
//! 1. **Walk + ingest.** Walker units run on a rayon pool inside one scope and
//!    stream entries through a bounded crossbeam channel to the single
//!    [`writer::BatchWriter`] thread. The scope ending is the signal that every
//!    unit (roots and everything they spawned) is done; the walker, and with
//!    it the last sender, is dropped right after, which closes the pipeline.
//! 2. **Drain.** The writer flushes its trailing batch and hands the store
//!    back by exiting.
//! 3. **Aggregate.** The store is reopened and [`crate::analysis::aggregate`]
//!    runs synchronously on the orchestrating thread.
pub mod admission;
pub mod cancel;
pub mod replay;
pub mod stats;
pub mod summary;
pub mod walker;
pub mod writer;

pub use cancel::CancelToken;
pub use stats::{ScanStats, StatsSnapshot};
pub use summary::{AggregationOutcome, ScanSummary};

use crate::analysis::aggregate;
use crate::config::{ScanConfig, ScanMode};
use crate::error::{ScanError, StoreError};
use crate::model::FailedDirectory;
use crate::platform::MetadataProvider;
use crate::store::{keys, RecordStore, WriteMode};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{error, info, warn};
use walker::Walker;
use writer::{BatchWriter, RunHeader, WriterSettings};

/// Handle to a scan running on a background thread.
pub struct ScanHandle {
    cancel: CancelToken,
    stats: Arc<ScanStats>,
    thread: thread::JoinHandle<Result<ScanSummary, ScanError>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible. Units already admitted
    /// finish their directory; the aggregation pass still runs over what was
    /// written.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A clone of the run's token, e.g. for a signal handler.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Live counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Wait for the run to finish.
    pub fn join(self) -> Result<ScanSummary, ScanError> {
        self.thread
            .join()
            .map_err(|_| ScanError::Panicked("scan"))?
    }
}

/// Start a run on a background thread.
pub fn start_scan(
    config: ScanConfig,
    mode: ScanMode,
    provider: Arc<dyn MetadataProvider>,
) -> Result<ScanHandle, ScanError> {
    config.validate()?;

    let cancel = CancelToken::new();
    let stats = Arc::new(ScanStats::default());

    let thread = {
        let cancel = cancel.clone();
        let stats = Arc::clone(&stats);
        thread::Builder::new()
            .name("dirledger-scan".into())
            .spawn(move || execute(&config, &mode, provider, &cancel, stats))
            .map_err(|source| ScanError::Spawn {
                name: "scan",
                source,
            })?
    };

    Ok(ScanHandle {
        cancel,
        stats,
        thread,
    })
}

/// Run to completion on the calling thread.
pub fn run_scan(
    config: &ScanConfig,
    mode: &ScanMode,
    provider: Arc<dyn MetadataProvider>,
    cancel: &CancelToken,
) -> Result<ScanSummary, ScanError> {
    config.validate()?;
    execute(config, mode, provider, cancel, Arc::new(ScanStats::default()))
}

fn execute(
    config: &ScanConfig,
    mode: &ScanMode,
    provider: Arc<dyn MetadataProvider>,
    cancel: &CancelToken,
    stats: Arc<ScanStats>,
) -> Result<ScanSummary, ScanError> {
    let started_at = Utc::now();
    let clock = Instant::now();
    info!(
        mode = mode.label(),
        store = %config.store_path.display(),
        started_at = %started_at.to_rfc3339(),
        "starting scan"
    );

    let roots = walk_roots(config, mode)?;
    let root_label = match mode {
        ScanMode::Full { .. } => roots.first().map(|r| r.path.clone()),
        ScanMode::ReplayErrors => None,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .thread_name(|i| format!("dirledger-walk-{i}"))
        .build()?;

    let (tx, rx) = crossbeam_channel::bounded(config.buffer_size);

    let writer = BatchWriter::spawn(
        WriterSettings {
            store_path: config.store_path.clone(),
            batch_size: config.batch_size,
            mode: match mode {
                ScanMode::Full { .. } => WriteMode::Insert,
                ScanMode::ReplayErrors => WriteMode::Upsert,
            },
            debug: config.debug,
        },
        RunHeader {
            mode: mode.label(),
            root: root_label,
            started_at,
        },
        rx,
        cancel.clone(),
        Arc::clone(&stats),
    )?;

    let walker = Walker::new(
        provider,
        config.admission_limit,
        cancel.clone(),
        tx,
        Arc::clone(&stats),
    )
    .with_debug(config.debug);

    pool.scope(|scope| {
        for root in &roots {
            let walker = &walker;
            let path = PathBuf::from(&root.path);
            let depth = root.depth;
            scope.spawn(move |s| walker.visit(s, path, depth));
        }
    });

    let peak_active_units = walker.limiter().peak();
    // Last sender goes with the walker; the writer drains and exits.
    drop(walker);
    info!("end of directory walk");

    let report = writer.join()?;
    info!(
        written = report.entries_written,
        dropped = report.entries_dropped,
        "store ingest finished"
    );

    let mut store = RecordStore::open_existing(&config.store_path).map_err(ScanError::Reopen)?;
    let aggregation = match aggregate(&mut store) {
        Ok(done) => AggregationOutcome {
            complete: true,
            directories_updated: done.directories,
            error: None,
        },
        Err(err) => {
            error!(error = %err, "aggregation pass aborted");
            AggregationOutcome {
                complete: false,
                directories_updated: err.directories_updated,
                error: Some(err.to_string()),
            }
        }
    };

    let finished_at = Utc::now();
    let summary = ScanSummary {
        mode: mode.label(),
        roots: roots.into_iter().map(|r| r.path).collect(),
        started_at,
        finished_at,
        duration_secs: clock.elapsed().as_secs_f64(),
        stats: stats.snapshot(),
        peak_active_units,
        admission_limit: config.admission_limit,
        aggregation,
        cancelled: cancel.is_cancelled(),
    };

    if let Err(err) = record_summary(&store, &summary) {
        warn!(error = %err, "failed to record run summary in scan_info");
    }

    info!(
        finished_at = %finished_at.to_rfc3339(),
        duration_secs = summary.duration_secs,
        dirs = summary.stats.dirs_found,
        files = summary.stats.files_found,
        errors = summary.stats.errors,
        cancelled = summary.cancelled,
        "end of scan"
    );
    Ok(summary)
}

/// The directories the walker starts from.
fn walk_roots(config: &ScanConfig, mode: &ScanMode) -> Result<Vec<FailedDirectory>, ScanError> {
    match mode {
        ScanMode::Full { root } => {
            let root = normalize_root(root);
            Ok(vec![FailedDirectory {
                path: root.to_string_lossy().into_owned(),
                depth: 1,
            }])
        }
        ScanMode::ReplayErrors => {
            let dirs = replay::select_failed_directories(&config.store_path)
                .map_err(ScanError::Replay)?;
            info!(count = dirs.len(), "directories selected for replay");
            for dir in &dirs {
                info!(path = %dir.path, depth = dir.depth, "replaying directory");
            }
            Ok(dirs)
        }
    }
}

/// Absolute, without `.` components or a trailing separator, so stored paths
/// line up with what `parent_path` derives.
fn normalize_root(root: &Path) -> PathBuf {
    let absolute = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    absolute.components().collect()
}

fn record_summary(store: &RecordStore, summary: &ScanSummary) -> Result<(), StoreError> {
    let status = if summary.cancelled {
        "cancelled"
    } else {
        "completed"
    };
    store.set_info(keys::STATUS, status)?;
    store.set_info(keys::FINISHED_AT, &summary.finished_at.to_rfc3339())?;
    store.set_info(keys::SUMMARY, &serde_json::to_string(summary)?)?;
    Ok(())
}
