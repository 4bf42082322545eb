//! dirledger — parallel filesystem inventory into SQLite.
//!
//! Thin binary entry point. All logic lives in the `dirledger-core`
//! and `dirledger-cli` crates.
use std::process::ExitCode;

fn main() -> ExitCode {
    dirledger_cli::run()
}
