//! Analysis modules — post-scan passes over the persisted entries.

pub mod rollup;

pub use rollup::{aggregate, AggregationReport};
