//! Audit log entries and the live-update change feed vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One audit log row. Writes are best-effort: a failed audit write is
/// logged by the server and never fails the audited operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    /// Acting user; `None` for anonymous/token actors.
    pub actor_id: Option<String>,
    /// Dotted action name, e.g. "login", "user.ban", "calendar.delete".
    pub action: String,
    /// Id of the affected user/calendar/resource, when there is one.
    pub target: Option<String>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What changed, as published on a calendar's SSE stream. Clients refetch
/// the matching resource collection on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Shift,
    Preset,
    Note,
    Calendar,
    SyncLog,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Shift => "shift",
            ChangeKind::Preset => "preset",
            ChangeKind::Note => "note",
            ChangeKind::Calendar => "calendar",
            ChangeKind::SyncLog => "sync_log",
        }
    }
}
