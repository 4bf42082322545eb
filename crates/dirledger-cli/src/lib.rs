//! dirledger CLI — argument parsing, prechecks, log sink and the run driver.
//!
//! All engine logic lives in `dirledger-core`; this crate only turns a
//! command line into a [`dirledger_core::ScanConfig`] and reports the result.
pub mod app;
pub mod args;
pub mod logging;
pub mod precheck;

use clap::Parser;
use std::process::ExitCode;

pub use app::{run_with, EXIT_FAILURE, EXIT_OK, EXIT_PRECHECK};
pub use args::Args;

/// Parse the process arguments and run.
pub fn run() -> ExitCode {
    ExitCode::from(run_with(Args::parse()))
}
