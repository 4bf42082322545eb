//! End-of-run report, logged, stored in `scan_info.summary` and printed by
//! frontends.
use crate::scanner::stats::StatsSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub mode: &'static str,
    /// Paths the walker started from: the scan root, or the replayed
    /// directories.
    pub roots: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub peak_active_units: usize,
    pub admission_limit: usize,
    pub aggregation: AggregationOutcome,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationOutcome {
    pub complete: bool,
    pub directories_updated: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanSummary {
    /// True when every batch landed and the rollups are final.
    pub fn is_clean(&self) -> bool {
        self.aggregation.complete && self.stats.batches_dropped == 0 && !self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat_counters() {
        let now = Utc::now();
        let summary = ScanSummary {
            mode: "full",
            roots: vec!["/r".into()],
            started_at: now,
            finished_at: now,
            duration_secs: 0.5,
            stats: StatsSnapshot {
                files_found: 3,
                ..StatsSnapshot::default()
            },
            peak_active_units: 2,
            admission_limit: 8,
            aggregation: AggregationOutcome {
                complete: true,
                directories_updated: 1,
                error: None,
            },
            cancelled: false,
        };

        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["mode"], "full");
        assert_eq!(json["files_found"], 3);
        assert_eq!(json["aggregation"]["complete"], true);
        assert!(json["aggregation"].get("error").is_none());
        assert!(summary.is_clean());
    }
}
