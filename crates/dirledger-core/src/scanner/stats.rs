//! Live scan counters, shared between walker units, the writer and callers.
//!
//! Plain relaxed atomics: the numbers are for reporting, nothing
//! synchronises on them.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ScanStats {
    pub dirs_found: AtomicU64,
    pub files_found: AtomicU64,
    pub others_found: AtomicU64,
    /// Entries emitted with `has_error` set.
    pub errors: AtomicU64,
    /// Sum of regular file sizes seen by the walker.
    pub bytes_found: AtomicU64,
    /// Units that were admitted after cancellation and skipped their work.
    pub units_skipped: AtomicU64,

    pub entries_written: AtomicU64,
    pub entries_dropped: AtomicU64,
    pub batches_written: AtomicU64,
    pub batches_dropped: AtomicU64,
}

/// Point-in-time copy of [`ScanStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub dirs_found: u64,
    pub files_found: u64,
    pub others_found: u64,
    pub errors: u64,
    pub bytes_found: u64,
    pub units_skipped: u64,
    pub entries_written: u64,
    pub entries_dropped: u64,
    pub batches_written: u64,
    pub batches_dropped: u64,
}

impl ScanStats {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            dirs_found: load(&self.dirs_found),
            files_found: load(&self.files_found),
            others_found: load(&self.others_found),
            errors: load(&self.errors),
            bytes_found: load(&self.bytes_found),
            units_skipped: load(&self.units_skipped),
            entries_written: load(&self.entries_written),
            entries_dropped: load(&self.entries_dropped),
            batches_written: load(&self.batches_written),
            batches_dropped: load(&self.batches_dropped),
        }
    }
}
