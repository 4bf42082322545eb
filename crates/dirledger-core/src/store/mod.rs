//! SQLite record store.
//!
//! One connection per phase: the batch writer owns a `RecordStore` while the
//! walk streams in, the aggregator owns a fresh one afterwards. The two never
//! overlap, so no locking is needed beyond SQLite's own transactions.
//!
//! # Layout
//!
//! ```text
//! entries    one row per file / directory / other object, keyed by path
//! scan_info  key/value run metadata + aggregation completion marker
//! ```
pub mod schema;

pub use schema::{keys, SCHEMA_VERSION};

use crate::error::{StoreError, StoreResult};
use crate::model::{Entry, EntryKind, FailedDirectory};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};

/// How the writer treats a path that is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain insert. A duplicate path fails the whole batch.
    Insert,
    /// Replace the stored row and clear its aggregate fields.
    Upsert,
}

/// The columns the aggregator needs from a directory row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRow {
    pub path: String,
    pub depth: u32,
    pub own_size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Finished aggregate values for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollup {
    pub path: String,
    pub subtree_size: u64,
    pub subtree_modified_at: Option<DateTime<Utc>>,
}

/// State of the aggregation completion marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationState {
    /// Entries are (being) written; aggregation has not started.
    Pending,
    /// A pass started and has not committed its last level. If no pass is
    /// running, the previous one was aborted.
    Running,
    /// Every stored directory has final rollups. After a cancelled run these
    /// cover only the part of the tree that was walked; check `status`.
    Complete,
    /// No marker recorded (store created outside the engine).
    Unknown,
}

impl AggregationState {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationState::Pending => "pending",
            AggregationState::Running => "running",
            AggregationState::Complete => "complete",
            AggregationState::Unknown => "unknown",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "pending" => AggregationState::Pending,
            "running" => AggregationState::Running,
            "complete" => AggregationState::Complete,
            _ => AggregationState::Unknown,
        }
    }
}

const INSERT_ENTRY: &str = "INSERT INTO entries \
     (kind, path, depth, own_size, has_error, error_message, owner, created_at, modified_at, accessed_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const UPSERT_ENTRY: &str = "INSERT INTO entries \
     (kind, path, depth, own_size, has_error, error_message, owner, created_at, modified_at, accessed_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
     ON CONFLICT(path) DO UPDATE SET \
         kind = excluded.kind, \
         depth = excluded.depth, \
         own_size = excluded.own_size, \
         subtree_size = NULL, \
         has_error = excluded.has_error, \
         error_message = excluded.error_message, \
         owner = excluded.owner, \
         created_at = excluded.created_at, \
         modified_at = excluded.modified_at, \
         accessed_at = excluded.accessed_at, \
         subtree_modified_at = NULL";

const SELECT_ENTRY_COLUMNS: &str = "SELECT kind, path, depth, own_size, subtree_size, has_error, \
     error_message, owner, created_at, accessed_at, modified_at, subtree_modified_at FROM entries";

/// Handle to one SQLite store file.
pub struct RecordStore {
    conn: Connection,
    path: PathBuf,
}

impl RecordStore {
    /// Open (creating if needed) the store at `path` and ensure the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        schema::create_schema(&conn)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open a store written by an earlier scan. Never creates a file, and
    /// leaves any other SQLite database untouched.
    pub fn open_existing(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if !schema::has_store_tables(&conn)? {
            return Err(StoreError::NotAStore(path.to_path_buf()));
        }
        schema::apply_pragmas(&conn)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Check, read-only, that `path` is a store written by an earlier scan.
    pub fn verify_existing(path: &Path) -> StoreResult<()> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if schema::has_store_tables(&conn)? {
            Ok(())
        } else {
            Err(StoreError::NotAStore(path.to_path_buf()))
        }
    }

    /// In-memory store for tests and dry runs.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        schema::create_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw connection, for callers that need ad-hoc queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ── Ingest ──────────────────────────────────────────────────────────

    /// Write `entries` as one transaction. On error nothing from the batch
    /// is kept.
    pub fn insert_batch(&mut self, entries: &[Entry], mode: WriteMode) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let sql = match mode {
            WriteMode::Insert => INSERT_ENTRY,
            WriteMode::Upsert => UPSERT_ENTRY,
        };

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for entry in entries {
                stmt.execute(params![
                    entry.kind.code(),
                    entry.path,
                    entry.depth as i64,
                    entry.own_size as i64,
                    entry.has_error,
                    entry.error_message,
                    entry.owner,
                    entry.created_at,
                    entry.modified_at,
                    entry.accessed_at,
                ])?;
            }
        }
        // Dropping `tx` on an early return above rolls the batch back.
        tx.commit()?;
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Directories flagged with an error, shallowest first.
    pub fn failed_directories(&self) -> StoreResult<Vec<FailedDirectory>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, depth FROM entries WHERE kind = 'd' AND has_error = 1 ORDER BY depth, path",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FailedDirectory {
                path: row.get(0)?,
                depth: row.get::<_, i64>(1)? as u32,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every directory row, deepest first. Ties are ordered by path so the
    /// pass is deterministic.
    pub fn directory_rows(&self) -> StoreResult<Vec<DirectoryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, depth, own_size, modified_at FROM entries \
             WHERE kind = 'd' ORDER BY depth DESC, path",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DirectoryRow {
                path: row.get(0)?,
                depth: row.get::<_, i64>(1)? as u32,
                own_size: row.get::<_, i64>(2)? as u64,
                modified_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Stream `(path, modified_at)` for every non-directory row that has a
    /// modification time.
    pub fn for_each_leaf_modified<F>(&self, mut f: F) -> StoreResult<()>
    where
        F: FnMut(&str, DateTime<Utc>),
    {
        let mut stmt = self.conn.prepare(
            "SELECT path, modified_at FROM entries WHERE kind != 'd' AND modified_at IS NOT NULL",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let path: String = row.get(0)?;
            let modified: DateTime<Utc> = row.get(1)?;
            f(&path, modified);
        }
        Ok(())
    }

    /// Persist one group of rollups as a single transaction.
    pub fn update_rollups(&mut self, rollups: &[Rollup]) -> StoreResult<()> {
        if rollups.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE entries SET subtree_size = ?1, subtree_modified_at = ?2 \
                 WHERE path = ?3 AND kind = 'd'",
            )?;
            for rollup in rollups {
                stmt.execute(params![
                    rollup.subtree_size as i64,
                    rollup.subtree_modified_at,
                    rollup.path,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Fetch one entry by path.
    pub fn entry(&self, path: &str) -> StoreResult<Option<Entry>> {
        let sql = format!("{SELECT_ENTRY_COLUMNS} WHERE path = ?1");
        let raw = self
            .conn
            .query_row(&sql, [path], RawEntry::from_row)
            .optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }

    /// Every stored entry, ordered by path.
    pub fn entries(&self) -> StoreResult<Vec<Entry>> {
        let sql = format!("{SELECT_ENTRY_COLUMNS} ORDER BY path");
        let mut stmt = self.conn.prepare(&sql)?;
        let raws = stmt
            .query_map([], RawEntry::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawEntry::into_entry).collect()
    }

    pub fn entry_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ── Run metadata ────────────────────────────────────────────────────

    pub fn set_info(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO scan_info (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }

    pub fn scan_info(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM scan_info WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_aggregation_state(&self, state: AggregationState) -> StoreResult<()> {
        self.set_info(keys::AGGREGATION, state.as_str())
    }

    pub fn aggregation_state(&self) -> StoreResult<AggregationState> {
        Ok(self
            .scan_info(keys::AGGREGATION)?
            .map(|v| AggregationState::parse(&v))
            .unwrap_or(AggregationState::Unknown))
    }
}

/// Column values as read, before the kind code is validated.
struct RawEntry {
    kind: String,
    entry: Entry,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut entry = Entry::new(EntryKind::Other, row.get::<_, String>(1)?, 1);
        entry.depth = row.get::<_, i64>(2)? as u32;
        entry.own_size = row.get::<_, i64>(3)? as u64;
        entry.subtree_size = row.get::<_, Option<i64>>(4)?.map(|v| v as u64);
        entry.has_error = row.get(5)?;
        entry.error_message = row.get(6)?;
        entry.owner = row.get(7)?;
        entry.created_at = row.get(8)?;
        entry.accessed_at = row.get(9)?;
        entry.modified_at = row.get(10)?;
        entry.subtree_modified_at = row.get(11)?;
        Ok(Self {
            kind: row.get(0)?,
            entry,
        })
    }

    fn into_entry(self) -> StoreResult<Entry> {
        let kind = EntryKind::from_code(&self.kind).ok_or(StoreError::InvalidKind(self.kind))?;
        Ok(Entry { kind, ..self.entry })
    }
}
