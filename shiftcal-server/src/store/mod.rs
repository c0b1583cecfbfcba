//! SQLite storage.
//!
//! One pooled connection manager shared by all handlers. Queries are plain
//! synchronous rusqlite; they are short enough that blocking the handler
//! task is fine in practice. Timestamps are stored as RFC 3339 text and
//! enums as their lowercase string forms.

mod access;
mod audit;
mod calendars;
mod scheduling;
mod users;

use std::fmt::Display;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use shiftcal_core::Error;

pub use audit::SyncLink;
pub use scheduling::NewShift;

mod schema;

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
        });
        let pool = Pool::new(manager).context("Failed to open connection pool")?;

        let store = SqliteStore { pool };
        let conn = store.pool.get().context("Failed to get connection")?;
        schema::apply(&conn).context("Failed to apply schema")?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> shiftcal_core::Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(store_err)
    }
}

/// Map any storage-layer failure onto the core store error.
pub(crate) fn store_err(err: impl Display) -> Error {
    Error::Store(err.to_string())
}

/// Build a rusqlite conversion error for a malformed stored value.
pub(crate) fn bad_column(idx: usize, msg: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into().into())
}

pub(crate) fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| bad_column(idx, format!("bad timestamp {s:?}: {e}")))
}

pub(crate) fn parse_ts_opt(idx: usize, s: Option<&str>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(idx, s)).transpose()
}

pub(crate) fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| bad_column(idx, format!("bad date {s:?}: {e}")))
}

pub(crate) fn parse_time_opt(idx: usize, s: Option<&str>) -> rusqlite::Result<Option<NaiveTime>> {
    s.map(|s| {
        NaiveTime::parse_from_str(s, "%H:%M:%S")
            .map_err(|e| bad_column(idx, format!("bad time {s:?}: {e}")))
    })
    .transpose()
}

pub(crate) fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn ts_opt(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(ts)
}

pub(crate) fn date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn time_opt(t: Option<NaiveTime>) -> Option<String> {
    t.map(|t| t.format("%H:%M:%S").to_string())
}
