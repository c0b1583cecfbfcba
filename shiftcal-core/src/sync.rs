//! External calendar sync records.
//!
//! Events pulled from an external provider (iCloud CalDAV) are stored
//! alongside a calendar's own shifts and surfaced read-only. Each sync run
//! leaves a log row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event imported from an external calendar, keyed by the provider's UID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalEvent {
    /// Provider event UID; replace-by-uid on re-import.
    pub uid: String,
    pub calendar_id: String,
    pub summary: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub all_day: bool,
    pub location: Option<String>,
    pub description: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of one sync run for one calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: String,
    pub calendar_id: String,
    pub status: SyncStatus,
    /// Error message when `status` is `Error`.
    pub message: Option<String>,
    /// Number of events imported in this run.
    pub imported: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Ok,
    Error,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Ok => "ok",
            SyncStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(SyncStatus::Ok),
            "error" => Some(SyncStatus::Error),
            _ => None,
        }
    }
}
