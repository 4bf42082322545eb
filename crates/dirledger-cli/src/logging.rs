//! Log sink: stdout plus a per-run file next to the store.
use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// `<store-stem>_<YYYYMMDD_HHMMSS>.log` in the store's directory.
pub fn log_file_path(store: &Path, now: chrono::DateTime<Local>) -> PathBuf {
    let stem = store
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dirledger".into());
    store.with_file_name(format!("{stem}_{}.log", now.format("%Y%m%d_%H%M%S")))
}

/// Install the global subscriber. `RUST_LOG` wins over `debug`.
pub fn init(store: &Path, debug: bool) -> Result<PathBuf> {
    let path = log_file_path(store, Local::now());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("dirledger_core={level},dirledger_cli={level},warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout.and(Mutex::new(file)))
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(debug)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(path)
}
