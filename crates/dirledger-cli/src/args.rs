//! Command-line arguments.
use clap::Parser;
use dirledger_core::config::{DEFAULT_ADMISSION_LIMIT, DEFAULT_BATCH_SIZE, DEFAULT_BUFFER_SIZE};
use std::path::PathBuf;

fn default_threads() -> usize {
    num_cpus::get()
}

/// Inventory a directory tree into a SQLite file
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dirledger",
    version,
    about = "Inventory a directory tree into a SQLite file",
    long_about = "Walks a directory tree in parallel, records one row per file and directory \
                  (size, timestamps, owner, error state) into SQLite, then rolls up subtree \
                  sizes and latest modification times per directory.",
    after_help = "EXAMPLES:\n    \
        dirledger --path /srv/share --store share\n    \
        dirledger --path /srv/share --store share.db --replay-errors-only\n    \
        dirledger --path D:\\data --store data.db --resolve-owner --threads 16"
)]
pub struct Args {
    /// Directory to scan
    #[arg(long, value_name = "DIR")]
    pub path: PathBuf,

    /// SQLite store file (".db" is appended when there is no extension)
    #[arg(long, value_name = "FILE")]
    pub store: PathBuf,

    /// Entries buffered between the walker and the writer
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE, value_name = "NUM")]
    pub buffer_size: usize,

    /// Entries per insert transaction
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, value_name = "NUM")]
    pub batch_size: usize,

    /// Maximum directory visits active at once
    #[arg(long, default_value_t = DEFAULT_ADMISSION_LIMIT, value_name = "NUM")]
    pub admission_limit: usize,

    /// Walker threads
    #[arg(long, default_value_t = default_threads(), value_name = "NUM")]
    pub threads: usize,

    /// Debug logging (per-directory and per-batch progress)
    #[arg(long)]
    pub debug: bool,

    /// Re-walk only directories recorded with errors in an existing store
    #[arg(long)]
    pub replay_errors_only: bool,

    /// Resolve file owners (slow on large trees)
    #[arg(long)]
    pub resolve_owner: bool,
}
