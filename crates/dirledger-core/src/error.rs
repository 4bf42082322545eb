//! Error types for the scan engine.
//!
//! Per-entry failures (permission denied, vanished files) are never errors at
//! this level; they are captured in the entry itself. These types cover the
//! failures that stop a component.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the SQLite record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database file could not be opened or created.
    #[error("failed to open store '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The file is a SQLite database but was not written by a scan.
    #[error("'{}' is not a dirledger store (no entries/scan_info tables)", .0.display())]
    NotAStore(PathBuf),

    /// Schema creation or pragma setup failed.
    #[error("failed to create store schema: {0}")]
    Schema(#[source] rusqlite::Error),

    /// Any other query or statement failure.
    #[error("store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A row held a kind code this build does not know.
    #[error("invalid entry kind '{0}' in store")]
    InvalidKind(String),

    /// The scan summary could not be encoded for `scan_info`.
    #[error("failed to encode scan summary: {0}")]
    Summary(#[from] serde_json::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures that abort a whole scan run.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The writer could not open the store or create the schema.
    /// Nothing was persisted.
    #[error("record store setup failed: {0}")]
    StoreSetup(#[source] StoreError),

    /// Replay mode could not read the failed-directory list.
    #[error("failed to select directories for replay: {0}")]
    Replay(#[source] StoreError),

    /// The store could not be reopened for the aggregation phase.
    #[error("failed to reopen store for aggregation: {0}")]
    Reopen(#[source] StoreError),

    #[error("failed to build walker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    Panicked(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// The aggregation pass stopped early.
///
/// Levels committed before the failure keep their final values; everything
/// shallower keeps its placeholder, and the store's aggregation marker stays
/// at "running".
#[derive(Error, Debug)]
#[error("aggregation aborted after {directories_updated} directories: {source}")]
pub struct AggregationError {
    pub directories_updated: u64,
    #[source]
    pub source: StoreError,
}
