//! Database schema definitions and creation.
//!
//! One `entries` row per filesystem object plus a small `scan_info` key/value
//! table for run metadata and the aggregation completion marker.

use crate::error::{StoreError, StoreResult};
use rusqlite::Connection;

/// Current schema version, recorded in `scan_info`.
pub const SCHEMA_VERSION: u32 = 1;

const CREATE_ENTRIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    kind                TEXT    NOT NULL CHECK (kind IN ('d', 'f', 'o')),
    path                TEXT    PRIMARY KEY NOT NULL,
    depth               INTEGER NOT NULL CHECK (depth >= 1),
    own_size            INTEGER NOT NULL DEFAULT 0,
    subtree_size        INTEGER,            -- NULL until aggregated
    has_error           INTEGER NOT NULL DEFAULT 0,
    error_message       TEXT,
    owner               TEXT,
    created_at          TEXT,
    modified_at         TEXT,
    accessed_at         TEXT,
    subtree_modified_at TEXT                -- NULL until aggregated
)
"#;

const CREATE_SCAN_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS scan_info (
    key   TEXT PRIMARY KEY,
    value TEXT
)
"#;

/// The aggregator and replay selector both filter on (kind, depth/has_error).
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_entries_kind_depth ON entries(kind, depth)",
    "CREATE INDEX IF NOT EXISTS idx_entries_errors ON entries(kind) WHERE has_error = 1",
];

/// Pragmas for the single-writer ingest phase.
const WRITE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;
PRAGMA cache_size = -65536;
"#;

/// Tables every store written by the engine carries.
const REQUIRED_TABLES: &[&str] = &["entries", "scan_info"];

/// Apply the ingest-phase pragmas only.
pub fn apply_pragmas(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(WRITE_PRAGMAS).map_err(StoreError::Schema)
}

/// True when `conn` already holds the engine's tables. Reads only.
pub fn has_store_tables(conn: &Connection) -> StoreResult<bool> {
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    for table in REQUIRED_TABLES {
        let count: i64 = stmt.query_row([*table], |row| row.get(0))?;
        if count == 0 {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Apply pragmas and create tables and indexes if missing.
pub fn create_schema(conn: &Connection) -> StoreResult<()> {
    apply_pragmas(conn)?;
    conn.execute(CREATE_ENTRIES_TABLE, [])
        .map_err(StoreError::Schema)?;
    conn.execute(CREATE_SCAN_INFO_TABLE, [])
        .map_err(StoreError::Schema)?;
    for sql in CREATE_INDEXES {
        conn.execute(sql, []).map_err(StoreError::Schema)?;
    }
    Ok(())
}

/// `scan_info` keys written by the engine.
pub mod keys {
    pub const SCHEMA_VERSION: &str = "schema_version";

    /// "running", "completed", "cancelled".
    pub const STATUS: &str = "status";

    /// "full" or "replay-errors".
    pub const MODE: &str = "mode";

    /// Scan root of the last full scan.
    pub const ROOT: &str = "root";

    pub const STARTED_AT: &str = "started_at";
    pub const FINISHED_AT: &str = "finished_at";

    /// Aggregation completion marker: "pending", "running", "complete".
    /// "complete" means every stored directory has final rollups; after a
    /// cancelled run (`status = cancelled`) those rollups cover only what was
    /// walked.
    pub const AGGREGATION: &str = "aggregation";

    /// JSON-encoded summary of the last run.
    pub const SUMMARY: &str = "summary";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('entries', 'scan_info')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn foreign_database_has_no_store_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE notes (body TEXT)").unwrap();
        assert!(!has_store_tables(&conn).unwrap());

        create_schema(&conn).unwrap();
        assert!(has_store_tables(&conn).unwrap());
    }

    #[test]
    fn schema_creation_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        create_schema(&conn).unwrap();
    }

    #[test]
    fn depth_below_one_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO entries (kind, path, depth) VALUES ('d', '/x', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
