//! SQLite storage for spent-time records.
//!
//! One row per record keyed by identity. Writes are plain upserts with no
//! version column, so the last writer wins.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};
use uuid::Uuid;

use spenttime_core::{DeleteResult, Record, SpentTime};

use crate::SqliteRepositoryError;

const SELECT_COLUMNS: &str = "SELECT identity, display_name, spent_millis FROM records";

/// Synchronous SQLite record store.
pub struct RecordDb {
    conn: Mutex<Connection>,
}

impl RecordDb {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, SqliteRepositoryError> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self::init(conn)?;
        info!(path = %path.display(), "record database initialized");
        Ok(db)
    }

    /// Fresh private in-memory database.
    pub fn open_in_memory() -> Result<Self, SqliteRepositoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SqliteRepositoryError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
                identity TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                spent_millis INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_records_name ON records(display_name);
            CREATE INDEX IF NOT EXISTS idx_records_spent ON records(spent_millis DESC, identity ASC);
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteRepositoryError> {
        self.conn.lock().map_err(|_| SqliteRepositoryError::Poisoned)
    }

    pub fn find(&self, identity: Uuid) -> Result<Option<Record>, SqliteRepositoryError> {
        let conn = self.lock()?;
        let row = conn
            .prepare_cached(&format!("{SELECT_COLUMNS} WHERE identity = ?1"))?
            .query_row(params![identity.to_string()], raw_row)
            .optional()?;
        row.map(into_record).transpose()
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Record>, SqliteRepositoryError> {
        let conn = self.lock()?;
        let row = conn
            .prepare_cached(&format!(
                "{SELECT_COLUMNS} WHERE display_name = ?1 ORDER BY identity LIMIT 1"
            ))?
            .query_row(params![name], raw_row)
            .optional()?;
        row.map(into_record).transpose()
    }

    pub fn find_all(&self) -> Result<Vec<Record>, SqliteRepositoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(SELECT_COLUMNS)?;
        let rows = stmt.query_map([], raw_row)?;
        collect_records(rows)
    }

    /// Top `limit` rows by spent time, ties broken by identity.
    pub fn find_top(&self, limit: usize) -> Result<Vec<Record>, SqliteRepositoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "{SELECT_COLUMNS} ORDER BY spent_millis DESC, identity ASC LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], raw_row)?;
        collect_records(rows)
    }

    pub fn upsert(&self, record: &Record) -> Result<(), SqliteRepositoryError> {
        let millis = record.spent_time().as_millis();
        let stored =
            i64::try_from(millis).map_err(|_| SqliteRepositoryError::OutOfRange(millis))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO records (identity, display_name, spent_millis)
             VALUES (?1, ?2, ?3)",
            params![record.identity().to_string(), record.display_name(), stored],
        )?;
        debug!(identity = %record.identity(), millis, "record upserted");
        Ok(())
    }

    /// Delete by identity, returning the row as it was.
    pub fn delete(&self, identity: Uuid) -> Result<DeleteResult, SqliteRepositoryError> {
        self.delete_where("identity = ?1", &identity.to_string())
    }

    pub fn delete_by_name(&self, name: &str) -> Result<DeleteResult, SqliteRepositoryError> {
        self.delete_where("display_name = ?1", name)
    }

    fn delete_where(
        &self,
        predicate: &str,
        key: &str,
    ) -> Result<DeleteResult, SqliteRepositoryError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let row = tx
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE {predicate} ORDER BY identity LIMIT 1"),
                params![key],
                raw_row,
            )
            .optional()?;
        let Some(row) = row else {
            return Ok(DeleteResult::not_found());
        };

        let identity = row.0.clone();
        let record = into_record(row)?;
        let deleted = tx.execute(
            "DELETE FROM records WHERE identity = ?1",
            params![identity],
        )?;
        tx.commit()?;

        Ok(if deleted == 1 {
            DeleteResult::deleted(record)
        } else {
            DeleteResult::failed(Some(record))
        })
    }
}

type RawRow = (String, String, i64);

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_record((identity, name, millis): RawRow) -> Result<Record, SqliteRepositoryError> {
    let corrupt = |reason: String| SqliteRepositoryError::CorruptRow {
        identity: identity.clone(),
        reason,
    };

    let uuid = Uuid::parse_str(&identity).map_err(|e| corrupt(e.to_string()))?;
    let millis = u64::try_from(millis).map_err(|_| corrupt(format!("negative time {millis}")))?;
    Record::with_time(uuid, name, SpentTime::from_millis(millis)).map_err(|e| corrupt(e.to_string()))
}

fn collect_records(
    rows: impl Iterator<Item = rusqlite::Result<RawRow>>,
) -> Result<Vec<Record>, SqliteRepositoryError> {
    rows.map(|row| into_record(row?)).collect()
}
