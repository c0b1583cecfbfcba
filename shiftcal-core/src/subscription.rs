//! Hiding and re-showing non-owned calendars.
//!
//! A subscription row is a personal visibility preference; it never changes
//! the underlying share or guest grant. The `source` is derived at call
//! time so the same table covers "hide a calendar someone shared with me"
//! and "unsubscribe from a public calendar".

use chrono::Utc;

use crate::calendar::{Subscription, SubscriptionSource, SubscriptionStatus};
use crate::error::{Error, Result};
use crate::permission::GuestPermission;
use crate::store::Store;

/// Hide `calendar_id` from the user's own view.
pub fn dismiss(store: &dyn Store, user_id: &str, calendar_id: &str) -> Result<()> {
    set_status(store, user_id, calendar_id, SubscriptionStatus::Dismissed)
}

/// Re-show a previously dismissed calendar, or subscribe to a public one.
pub fn undismiss(store: &dyn Store, user_id: &str, calendar_id: &str) -> Result<()> {
    set_status(store, user_id, calendar_id, SubscriptionStatus::Subscribed)
}

fn set_status(
    store: &dyn Store,
    user_id: &str,
    calendar_id: &str,
    status: SubscriptionStatus,
) -> Result<()> {
    let calendar = store
        .calendar(calendar_id)?
        .ok_or_else(|| Error::CalendarNotFound(calendar_id.to_string()))?;

    // Ownership is dismiss-proof; a subscription row must never exist for
    // an owned calendar.
    if calendar.owner_id.as_deref() == Some(user_id) {
        return Err(Error::InvalidOperation(
            "cannot dismiss own calendar".to_string(),
        ));
    }

    let share = store.share(calendar_id, user_id)?;

    if status == SubscriptionStatus::Subscribed
        && share.is_none()
        && calendar.guest_permission == GuestPermission::None
    {
        return Err(Error::NotPublic);
    }

    let source = if share.is_some() {
        SubscriptionSource::Shared
    } else {
        SubscriptionSource::Guest
    };

    store.upsert_subscription(&Subscription {
        user_id: user_id.to_string(),
        calendar_id: calendar_id.to_string(),
        status,
        source,
        updated_at: Utc::now(),
    })
}
