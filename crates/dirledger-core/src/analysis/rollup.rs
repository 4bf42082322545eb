//! Bottom-up subtree rollups over the persisted directory rows.
//!
//! Directory rows are processed in strictly descending depth, so by the time
//! a directory at depth `d` is finalised every child at `d + 1` already is.
//! Each finished directory is folded into its parent, found by stripping the
//! last path separator. No prefix matching: `/a/bc` never feeds `/a/b`.
//!
//! Leaf rows (files and other objects) only contribute their `modified_at`;
//! their bytes are already in the parent's `own_size`.
//!
//! Each depth level is committed as one transaction, deepest first. The
//! `scan_info.aggregation` marker is "running" for the whole pass and only
//! becomes "complete" after the last level commits.
use crate::error::{AggregationError, StoreError};
use crate::model::parent_path;
use crate::store::{AggregationState, RecordStore, Rollup};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of a completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationReport {
    pub directories: u64,
    pub levels: u32,
    pub duration: Duration,
}

/// Running totals for one directory while its children are folded in.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    child_size: u64,
    latest: Option<DateTime<Utc>>,
}

/// Compute and persist `subtree_size` / `subtree_modified_at` for every
/// directory row in `store`.
pub fn aggregate(store: &mut RecordStore) -> Result<AggregationReport, AggregationError> {
    let start = Instant::now();
    let abort = |directories_updated: u64| {
        move |source: StoreError| AggregationError {
            directories_updated,
            source,
        }
    };

    info!(store = %store.path().display(), "starting aggregation pass");
    store
        .set_aggregation_state(AggregationState::Running)
        .map_err(abort(0))?;

    let rows = store.directory_rows().map_err(abort(0))?;

    let mut totals: HashMap<String, Accumulator> = rows
        .iter()
        .map(|row| {
            (
                row.path.clone(),
                Accumulator {
                    child_size: 0,
                    latest: row.modified_at,
                },
            )
        })
        .collect();

    store
        .for_each_leaf_modified(|path, modified| {
            if let Some(acc) = parent_path(path).and_then(|p| totals.get_mut(p)) {
                acc.latest = acc.latest.max(Some(modified));
            }
        })
        .map_err(abort(0))?;

    let mut updated: u64 = 0;
    let mut levels: u32 = 0;

    for level in rows.chunk_by(|a, b| a.depth == b.depth) {
        let mut rollups = Vec::with_capacity(level.len());

        for row in level {
            let acc = totals.get(&row.path).copied().unwrap_or_default();
            let subtree_size = row.own_size + acc.child_size;
            let latest = acc.latest.max(row.modified_at);

            if let Some(parent) = parent_path(&row.path).and_then(|p| totals.get_mut(p)) {
                parent.child_size += subtree_size;
                parent.latest = parent.latest.max(latest);
            }

            rollups.push(Rollup {
                path: row.path.clone(),
                subtree_size,
                subtree_modified_at: latest,
            });
        }

        store.update_rollups(&rollups).map_err(abort(updated))?;
        updated += rollups.len() as u64;
        levels += 1;
        debug!(depth = level[0].depth, directories = rollups.len(), "committed aggregation level");
    }

    store
        .set_aggregation_state(AggregationState::Complete)
        .map_err(abort(updated))?;

    let duration = start.elapsed();
    info!(directories = updated, levels, ?duration, "end of aggregation pass");

    Ok(AggregationReport {
        directories: updated,
        levels,
        duration,
    })
}
