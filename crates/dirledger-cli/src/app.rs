//! Drives one run: precheck, logging, engine, summary.
use crate::args::Args;
use crate::logging;
use crate::precheck::{precheck, Checked};
use anyhow::{Context, Result};
use dirledger_core::platform::FsMetadataProvider;
use dirledger_core::scanner::start_scan;
use dirledger_core::{ScanConfig, ScanMode};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_PRECHECK: u8 = 2;

/// Run with already-parsed arguments and return the process exit code.
pub fn run_with(args: Args) -> u8 {
    let checked = match precheck(&args) {
        Ok(checked) => checked,
        Err(problems) => {
            for problem in &problems {
                eprintln!("{problem}");
            }
            return EXIT_PRECHECK;
        }
    };

    match execute(&args, checked) {
        Ok(true) => EXIT_OK,
        Ok(false) => EXIT_FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            EXIT_FAILURE
        }
    }
}

/// Returns whether the run finished with final rollups.
fn execute(args: &Args, checked: Checked) -> Result<bool> {
    let log_path = logging::init(&checked.store, args.debug)?;
    println!("Logs will be saved to {}", log_path.display());

    info!("basic checks completed");
    info!(path = %checked.root.display(), "scan root");
    info!(store = %checked.store.display(), "record store");
    info!(
        replay_errors_only = args.replay_errors_only,
        debug = args.debug,
        resolve_owner = args.resolve_owner,
        "run options"
    );

    let config = ScanConfig {
        store_path: checked.store,
        buffer_size: args.buffer_size,
        batch_size: args.batch_size,
        admission_limit: args.admission_limit,
        worker_threads: args.threads,
        resolve_owner: args.resolve_owner,
        debug: args.debug,
    };
    let mode = if args.replay_errors_only {
        ScanMode::ReplayErrors
    } else {
        ScanMode::Full { root: checked.root }
    };
    info!(
        buffer_size = config.buffer_size,
        batch_size = config.batch_size,
        admission_limit = config.admission_limit,
        threads = config.worker_threads,
        "engine settings"
    );

    let provider = Arc::new(FsMetadataProvider::new(config.resolve_owner));
    let handle = start_scan(config, mode, provider).context("Failed to start scan")?;

    let cancel = handle.cancel_token();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing admitted directories...");
        cancel.cancel();
    })
    .context("Failed to set signal handler")?;

    let summary = handle.join().context("Scan failed")?;

    if summary.cancelled {
        warn!("scan was cancelled before completion");
    }
    if summary.stats.batches_dropped > 0 {
        warn!(
            batches = summary.stats.batches_dropped,
            entries = summary.stats.entries_dropped,
            "some batches could not be written"
        );
    }
    if let Some(err) = &summary.aggregation.error {
        error!(error = %err, "rollups are incomplete");
    }

    let report = serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
    println!("{report}");

    Ok(summary.aggregation.complete)
}
