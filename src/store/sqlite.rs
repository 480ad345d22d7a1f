//! SQLite-backed dedup store

use super::{AdmissionRecord, DedupStore, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS admissions (
    address       TEXT PRIMARY KEY NOT NULL,
    first_seen_ms INTEGER NOT NULL,
    sent_at_ms    INTEGER
);
CREATE INDEX IF NOT EXISTS idx_admissions_sent_at ON admissions (sent_at_ms);
"#;

/// Dedup store persisted in a single SQLite file
pub struct SqliteDedupStore {
    conn: Connection,
}

impl SqliteDedupStore {
    /// Open the store at `path`, creating the file and schema on first run
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "Configured dedup store journal");
        conn.pragma_update(None, "synchronous", "FULL")?;

        let store = Self::init(conn)?;
        tracing::info!(path = %path.display(), sent = store.sent_count()?, "Opened dedup store");
        Ok(store)
    }

    /// Open a throwaway store that lives only as long as the value
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Number of addresses with a confirmed alert
    pub fn sent_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM admissions WHERE sent_at_ms IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Full record for one address
    pub fn get(&self, address: &str) -> Result<Option<AdmissionRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT address, first_seen_ms, sent_at_ms FROM admissions WHERE address = ?1",
                params![address],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(to_record).transpose()
    }

    /// Most recently sent records, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<AdmissionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT address, first_seen_ms, sent_at_ms FROM admissions
             WHERE sent_at_ms IS NOT NULL
             ORDER BY sent_at_ms DESC, address ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(to_record(row?)?);
        }
        Ok(records)
    }

    /// Close the underlying connection
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}

impl DedupStore for SqliteDedupStore {
    fn has_sent(&self, address: &str) -> Result<bool, StoreError> {
        let sent: Option<bool> = self
            .conn
            .query_row(
                "SELECT sent_at_ms IS NOT NULL FROM admissions WHERE address = ?1",
                params![address],
                |row| row.get(0),
            )
            .optional()?;
        Ok(sent.unwrap_or(false))
    }

    fn mark_sent(&mut self, address: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO admissions (address, first_seen_ms, sent_at_ms) VALUES (?1, ?2, ?2)
             ON CONFLICT(address) DO UPDATE
             SET sent_at_ms = COALESCE(admissions.sent_at_ms, excluded.sent_at_ms)",
            params![address, at.timestamp_millis()],
        )?;
        Ok(())
    }

    fn record_seen(&mut self, address: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO admissions (address, first_seen_ms) VALUES (?1, ?2)
             ON CONFLICT(address) DO NOTHING",
            params![address, at.timestamp_millis()],
        )?;
        Ok(())
    }

    fn first_seen(&self, address: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let ms: Option<i64> = self
            .conn
            .query_row(
                "SELECT first_seen_ms FROM admissions WHERE address = ?1",
                params![address],
                |row| row.get(0),
            )
            .optional()?;
        ms.map(from_millis).transpose()
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms).ok_or(StoreError::BadTimestamp(ms))
}

fn to_record(
    (address, first_seen_ms, sent_at_ms): (String, i64, Option<i64>),
) -> Result<AdmissionRecord, StoreError> {
    Ok(AdmissionRecord {
        address,
        first_seen: from_millis(first_seen_ms)?,
        sent_at: sent_at_ms.map(from_millis).transpose()?,
    })
}
