//! Storage seam for permission resolution.
//!
//! The resolver, enumerator, and subscription operations only ever touch
//! the store through this trait. The server implements it on SQLite; tests
//! use the in-memory [`MemStore`].
//!
//! All reads are independent, side-effect-free lookups; the only writes are
//! the subscription upsert and the best-effort token usage counter.

use crate::calendar::{AccessToken, Calendar, CalendarShare, Subscription};
use crate::error::Result;
use crate::user::User;

/// Read/upsert surface required by the permission core.
pub trait Store: Send + Sync {
    fn calendar(&self, id: &str) -> Result<Option<Calendar>>;

    fn user(&self, id: &str) -> Result<Option<User>>;

    /// Share row for (calendar, user), unique if present.
    fn share(&self, calendar_id: &str, user_id: &str) -> Result<Option<CalendarShare>>;

    fn shares_for_user(&self, user_id: &str) -> Result<Vec<CalendarShare>>;

    /// Look up an access token by its opaque value.
    fn token_by_value(&self, token: &str) -> Result<Option<AccessToken>>;

    fn subscription(&self, user_id: &str, calendar_id: &str) -> Result<Option<Subscription>>;

    fn subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>>;

    fn calendars_owned_by(&self, user_id: &str) -> Result<Vec<Calendar>>;

    /// Owned (non-orphaned) calendars with guest access enabled.
    fn guest_visible_calendars(&self) -> Result<Vec<Calendar>>;

    /// Insert or replace the subscription row for (user, calendar).
    fn upsert_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Bump a token's usage counter and last-used timestamp. Callers treat
    /// this as fire-and-forget; failures are logged, never propagated.
    fn record_token_usage(&self, token_id: &str) -> Result<()>;
}
