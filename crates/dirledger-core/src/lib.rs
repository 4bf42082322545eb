//! dirledger core — walking, streaming, storage and rollups.
//!
//! This crate contains all engine logic with zero CLI dependencies.
//! Frontends drive it through [`scanner::start_scan`] / [`scanner::run_scan`]
//! and read results back through [`store::RecordStore`].
//!
//! # Modules
//!
//! - [`model`] — Entry records and the failed-directory view.
//! - [`scanner`] — Recursive walker, admission limiter, pipeline, batch writer
//!   and orchestration.
//! - [`store`] — SQLite record store and schema.
//! - [`analysis`] — Post-scan aggregation pass.
//! - [`platform`] — Metadata provider (timestamps and ownership).
pub mod analysis;
pub mod config;
pub mod error;
pub mod model;
pub mod platform;
pub mod scanner;
pub mod store;

pub use config::{ScanConfig, ScanMode};
pub use error::{AggregationError, ScanError, StoreError};
