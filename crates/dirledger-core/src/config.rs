//! Run configuration passed explicitly into every component.

use crate::error::ScanError;
use std::path::PathBuf;

/// Default pipeline capacity (entries buffered between walker and writer).
pub const DEFAULT_BUFFER_SIZE: usize = 100_000;

/// Default number of entries per insert transaction.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Default number of directory visits allowed to run at once.
pub const DEFAULT_ADMISSION_LIMIT: usize = 8_000;

/// Settings for one scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// SQLite file the writer persists into.
    pub store_path: PathBuf,

    /// Capacity of the walker → writer channel. Producers block when full.
    pub buffer_size: usize,

    /// Entries per insert transaction.
    pub batch_size: usize,

    /// Maximum concurrently active directory visits.
    pub admission_limit: usize,

    /// Walker pool size.
    pub worker_threads: usize,

    /// Ask the metadata provider to resolve file ownership.
    pub resolve_owner: bool,

    /// Emit per-unit and per-batch debug logging.
    pub debug: bool,
}

impl ScanConfig {
    /// Configuration with default tuning for the given store file.
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            ..Self::default()
        }
    }

    /// Reject settings that would deadlock or spin.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.buffer_size == 0 {
            return Err(ScanError::Config("buffer size must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ScanError::Config("batch size must be at least 1".into()));
        }
        if self.admission_limit == 0 {
            return Err(ScanError::Config(
                "admission limit must be at least 1".into(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(ScanError::Config(
                "worker thread count must be at least 1".into(),
            ));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(ScanError::Config("store path is empty".into()));
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            admission_limit: DEFAULT_ADMISSION_LIMIT,
            worker_threads: num_cpus::get(),
            resolve_owner: false,
            debug: false,
        }
    }
}

/// What the walker starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// Walk the whole tree under `root` into a fresh store.
    Full { root: PathBuf },
    /// Re-walk only directories flagged with errors in an existing store.
    ReplayErrors,
}

impl ScanMode {
    /// Short label stored in `scan_info.mode`.
    pub fn label(&self) -> &'static str {
        match self {
            ScanMode::Full { .. } => "full",
            ScanMode::ReplayErrors => "replay-errors",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScanConfig::new("scan.db");
        assert_eq!(config.buffer_size, 100_000);
        assert_eq!(config.batch_size, 200);
        assert_eq!(config.admission_limit, 8_000);
        assert!(config.worker_threads >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let mut config = ScanConfig::new("scan.db");
        config.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = ScanConfig::new("scan.db");
        config.buffer_size = 0;
        assert!(config.validate().is_err());

        let mut config = ScanConfig::new("scan.db");
        config.admission_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_store_path_is_rejected() {
        assert!(ScanConfig::default().validate().is_err());
    }
}
