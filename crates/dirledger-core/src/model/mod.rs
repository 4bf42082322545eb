//! Data model for dirledger records.
//!
//! Re-exports the entry record and supporting types.
pub mod entry;

pub use entry::{parent_path, Entry, EntryKind, FailedDirectory};
