//! Batched store writer — the single consumer of the walk pipeline.
//!
//! Runs on a dedicated thread that owns the store connection for the whole
//! ingest phase. Entries are grouped into fixed-size batches and each batch is
//! one transaction.
//!
//! # Failure policy
//!
//! - Store open / schema failure: raise cancellation, write nothing, return
//!   the error. The receiver is dropped on exit, so blocked producers wake up
//!   with a send error instead of hanging.
//! - Batch failure: the transaction is rolled back, the batch is logged and
//!   dropped, and draining continues.
use crate::error::{ScanError, StoreError};
use crate::model::Entry;
use crate::scanner::cancel::CancelToken;
use crate::scanner::stats::ScanStats;
use crate::store::{keys, AggregationState, RecordStore, WriteMode, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Run metadata recorded in `scan_info` when the writer opens the store.
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub mode: &'static str,
    pub root: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// What the writer did with the entries it received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterReport {
    pub entries_written: u64,
    pub entries_dropped: u64,
    pub batches_written: u64,
    pub batches_dropped: u64,
}

/// Tuning for the writer thread.
#[derive(Debug, Clone)]
pub struct WriterSettings {
    pub store_path: PathBuf,
    pub batch_size: usize,
    pub mode: WriteMode,
    pub debug: bool,
}

/// Handle to the running writer thread.
pub struct BatchWriter {
    handle: JoinHandle<Result<WriterReport, StoreError>>,
}

impl BatchWriter {
    /// Spawn the writer. The store is opened on the writer thread itself, so
    /// a setup failure surfaces through [`BatchWriter::join`] and through the
    /// cancellation token.
    pub fn spawn(
        settings: WriterSettings,
        header: RunHeader,
        receiver: Receiver<Entry>,
        cancel: CancelToken,
        stats: Arc<ScanStats>,
    ) -> Result<Self, ScanError> {
        let handle = thread::Builder::new()
            .name("dirledger-writer".into())
            .spawn(move || writer_thread(settings, header, receiver, cancel, stats))
            .map_err(|source| ScanError::Spawn {
                name: "writer",
                source,
            })?;
        Ok(Self { handle })
    }

    /// Wait for the writer to drain the closed pipeline.
    pub fn join(self) -> Result<WriterReport, ScanError> {
        match self.handle.join() {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(err)) => Err(ScanError::StoreSetup(err)),
            Err(_) => Err(ScanError::Panicked("writer")),
        }
    }
}

fn writer_thread(
    settings: WriterSettings,
    header: RunHeader,
    receiver: Receiver<Entry>,
    cancel: CancelToken,
    stats: Arc<ScanStats>,
) -> Result<WriterReport, StoreError> {
    let mut store = match open_store(&settings, &header) {
        Ok(store) => store,
        Err(err) => {
            error!(store = %settings.store_path.display(), error = %err, "cannot open record store");
            error!("sending cancellation signal from writer");
            cancel.cancel();
            return Err(err);
        }
    };

    let batch_size = settings.batch_size.max(1);
    let mut batch: Vec<Entry> = Vec::with_capacity(batch_size);
    let mut report = WriterReport::default();

    for entry in receiver.iter() {
        batch.push(entry);
        if batch.len() >= batch_size {
            flush(&mut store, &mut batch, &settings, &stats, &mut report, receiver.len());
        }
    }

    // Trailing partial batch once every producer is gone.
    flush(&mut store, &mut batch, &settings, &stats, &mut report, 0);

    info!(
        written = report.entries_written,
        dropped = report.entries_dropped,
        batches = report.batches_written,
        "end of store insertion"
    );
    Ok(report)
}

fn open_store(settings: &WriterSettings, header: &RunHeader) -> Result<RecordStore, StoreError> {
    let store = RecordStore::open(&settings.store_path)?;
    store.set_info(keys::SCHEMA_VERSION, &SCHEMA_VERSION.to_string())?;
    store.set_info(keys::STATUS, "running")?;
    store.set_info(keys::MODE, header.mode)?;
    store.set_info(keys::STARTED_AT, &header.started_at.to_rfc3339())?;
    if let Some(root) = &header.root {
        store.set_info(keys::ROOT, root)?;
    }
    store.set_aggregation_state(AggregationState::Pending)?;
    Ok(store)
}

/// Write `batch` as one transaction and clear it, successful or not.
fn flush(
    store: &mut RecordStore,
    batch: &mut Vec<Entry>,
    settings: &WriterSettings,
    stats: &ScanStats,
    report: &mut WriterReport,
    pending: usize,
) {
    if batch.is_empty() {
        return;
    }
    let count = batch.len() as u64;

    match store.insert_batch(batch, settings.mode) {
        Ok(()) => {
            report.entries_written += count;
            report.batches_written += 1;
            ScanStats::bump(&stats.entries_written, count);
            ScanStats::bump(&stats.batches_written, 1);
            if settings.debug {
                debug!(
                    written = report.entries_written,
                    pending,
                    "inserted batch"
                );
            }
        }
        Err(err) => {
            error!(entries = count, error = %err, "failed to insert batch, dropping it");
            report.entries_dropped += count;
            report.batches_dropped += 1;
            ScanStats::bump(&stats.entries_dropped, count);
            ScanStats::bump(&stats.batches_dropped, 1);
        }
    }

    batch.clear();
}
