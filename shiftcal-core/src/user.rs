//! User accounts and ban state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permission::Role;

/// A user account.
///
/// Credentials (salt + password digest) live only in the server's store and
/// are never part of this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub banned: bool,
    pub ban_reason: Option<String>,
    /// When set, the ban lifts automatically after this instant.
    pub ban_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the ban is in force at `now`. A ban with no expiry is permanent.
    pub fn ban_active(&self, now: DateTime<Utc>) -> bool {
        self.banned && self.ban_expires_at.is_none_or(|until| until > now)
    }
}
