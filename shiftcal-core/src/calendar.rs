//! Calendars and the access grants attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permission::{GuestPermission, Permission};

/// A shift calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub name: String,
    /// Display color, e.g. "#3b82f6".
    pub color: String,
    /// `None` means the owning account was deleted. Orphaned calendars are
    /// invisible to every non-admin path regardless of shares or tokens.
    pub owner_id: Option<String>,
    pub guest_permission: GuestPermission,
    pub created_at: DateTime<Utc>,
}

impl Calendar {
    pub fn is_orphaned(&self) -> bool {
        self.owner_id.is_none()
    }
}

/// An explicit grant of a calendar to a user. Unique per (calendar, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarShare {
    pub calendar_id: String,
    pub user_id: String,
    pub permission: Permission,
    /// User who granted the share.
    pub shared_by: String,
    pub shared_at: DateTime<Utc>,
}

/// An opaque shareable credential granting a fixed permission on one
/// calendar, without requiring an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: String,
    /// The opaque token value presented by clients.
    pub token: String,
    pub calendar_id: String,
    pub permission: Permission,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    /// Best-effort usage metric; increments may be lost under concurrency.
    pub use_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether this token grants anything at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// A user's personal visibility preference for a calendar they do not own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: String,
    pub calendar_id: String,
    pub status: SubscriptionStatus,
    pub source: SubscriptionSource,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Subscribed,
    Dismissed,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Subscribed => "subscribed",
            SubscriptionStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "subscribed" => Some(SubscriptionStatus::Subscribed),
            "dismissed" => Some(SubscriptionStatus::Dismissed),
            _ => None,
        }
    }
}

/// How the subscription came to exist: via an explicit share or via the
/// public/guest path. Derived at write time, not chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionSource {
    Shared,
    Guest,
}

impl SubscriptionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionSource::Shared => "shared",
            SubscriptionSource::Guest => "guest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shared" => Some(SubscriptionSource::Shared),
            "guest" => Some(SubscriptionSource::Guest),
            _ => None,
        }
    }
}
