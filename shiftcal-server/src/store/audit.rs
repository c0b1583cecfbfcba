//! Audit log and external sync persistence.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;
use shiftcal_core::{AuditEntry, ExternalEvent, Result, SyncLogEntry, SyncStatus};
use uuid::Uuid;

use super::{SqliteStore, bad_column, parse_ts, store_err, ts};

/// The iCloud binding of one calendar. The app password is stored as
/// entered; it never leaves the server in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SyncLink {
    pub calendar_id: String,
    pub apple_id: String,
    #[serde(skip_serializing)]
    pub app_password: String,
    pub remote_url: String,
    pub remote_name: String,
    pub created_at: DateTime<Utc>,
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get("id")?,
        actor_id: row.get("actor_id")?,
        action: row.get("action")?,
        target: row.get("target")?,
        detail: row.get("detail")?,
        created_at: parse_ts(0, &row.get::<_, String>("created_at")?)?,
    })
}

fn sync_log_from_row(row: &Row<'_>) -> rusqlite::Result<SyncLogEntry> {
    let status: String = row.get("status")?;
    Ok(SyncLogEntry {
        id: row.get("id")?,
        calendar_id: row.get("calendar_id")?,
        status: SyncStatus::parse(&status)
            .ok_or_else(|| bad_column(0, format!("bad sync status {status:?}")))?,
        message: row.get("message")?,
        imported: row.get("imported")?,
        created_at: parse_ts(0, &row.get::<_, String>("created_at")?)?,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<SyncLink> {
    Ok(SyncLink {
        calendar_id: row.get("calendar_id")?,
        apple_id: row.get("apple_id")?,
        app_password: row.get("app_password")?,
        remote_url: row.get("remote_url")?,
        remote_name: row.get("remote_name")?,
        created_at: parse_ts(0, &row.get::<_, String>("created_at")?)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ExternalEvent> {
    Ok(ExternalEvent {
        uid: row.get("uid")?,
        calendar_id: row.get("calendar_id")?,
        summary: row.get("summary")?,
        starts_at: parse_ts(0, &row.get::<_, String>("starts_at")?)?,
        ends_at: parse_ts(0, &row.get::<_, String>("ends_at")?)?,
        all_day: row.get("all_day")?,
        location: row.get("location")?,
        description: row.get("description")?,
        fetched_at: parse_ts(0, &row.get::<_, String>("fetched_at")?)?,
    })
}

impl SqliteStore {
    pub fn record_audit(
        &self,
        actor_id: Option<&str>,
        action: &str,
        target: Option<&str>,
        detail: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_log (id, actor_id, action, target, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                actor_id,
                action,
                target,
                detail,
                ts(Utc::now()),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    /// Most recent entries first.
    pub fn list_audit(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM audit_log ORDER BY created_at DESC LIMIT ?1")
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![limit], audit_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    pub fn clear_audit(&self) -> Result<usize> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM audit_log", []).map_err(store_err)
    }

    // ==================== Sync links ====================

    pub fn put_sync_link(&self, link: &SyncLink) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_links (calendar_id, apple_id, app_password, remote_url, remote_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (calendar_id) DO UPDATE
             SET apple_id = ?2, app_password = ?3, remote_url = ?4, remote_name = ?5, created_at = ?6",
            params![
                link.calendar_id,
                link.apple_id,
                link.app_password,
                link.remote_url,
                link.remote_name,
                ts(link.created_at),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    pub fn sync_link(&self, calendar_id: &str) -> Result<Option<SyncLink>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM sync_links WHERE calendar_id = ?1",
            params![calendar_id],
            link_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    /// Unlink and drop the imported events with it.
    pub fn delete_sync_link(&self, calendar_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "DELETE FROM sync_links WHERE calendar_id = ?1",
                params![calendar_id],
            )
            .map_err(store_err)?;
        conn.execute(
            "DELETE FROM external_events WHERE calendar_id = ?1",
            params![calendar_id],
        )
        .map_err(store_err)?;
        Ok(changed > 0)
    }

    // ==================== Sync runs ====================

    pub fn record_sync(
        &self,
        calendar_id: &str,
        status: SyncStatus,
        message: Option<&str>,
        imported: i64,
    ) -> Result<SyncLogEntry> {
        let conn = self.conn()?;
        let entry = SyncLogEntry {
            id: Uuid::new_v4().to_string(),
            calendar_id: calendar_id.to_string(),
            status,
            message: message.map(str::to_string),
            imported,
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO sync_log (id, calendar_id, status, message, imported, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id,
                entry.calendar_id,
                entry.status.as_str(),
                entry.message,
                entry.imported,
                ts(entry.created_at),
            ],
        )
        .map_err(store_err)?;
        Ok(entry)
    }

    pub fn sync_log_for_calendar(
        &self,
        calendar_id: &str,
        limit: i64,
    ) -> Result<Vec<SyncLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM sync_log WHERE calendar_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![calendar_id, limit], sync_log_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    // ==================== External events ====================

    /// Replace the imported events of one calendar in a single transaction,
    /// so readers never observe a half-synced state.
    pub fn replace_external_events(
        &self,
        calendar_id: &str,
        events: &[ExternalEvent],
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(store_err)?;
        tx.execute(
            "DELETE FROM external_events WHERE calendar_id = ?1",
            params![calendar_id],
        )
        .map_err(store_err)?;
        for event in events {
            tx.execute(
                "INSERT INTO external_events (calendar_id, uid, summary, starts_at, ends_at, all_day, location, description, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT (calendar_id, uid) DO UPDATE
                 SET summary = ?3, starts_at = ?4, ends_at = ?5, all_day = ?6,
                     location = ?7, description = ?8, fetched_at = ?9",
                params![
                    calendar_id,
                    event.uid,
                    event.summary,
                    ts(event.starts_at),
                    ts(event.ends_at),
                    event.all_day,
                    event.location,
                    event.description,
                    ts(event.fetched_at),
                ],
            )
            .map_err(store_err)?;
        }
        tx.commit().map_err(store_err)
    }

    pub fn external_events_in_range(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM external_events
                 WHERE calendar_id = ?1 AND starts_at < ?3 AND ends_at > ?2
                 ORDER BY starts_at",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![calendar_id, ts(from), ts(to)], event_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }
}
