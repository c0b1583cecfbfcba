//! The core [`Store`] trait over SQLite: the read surface the permission
//! resolver and enumerator run against, plus the subscription upsert and
//! the token usage counter.

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use shiftcal_core::{
    AccessToken, Calendar, CalendarShare, GuestPermission, Permission, Result, Role, Store,
    Subscription, SubscriptionSource, SubscriptionStatus, User,
};

use super::{SqliteStore, bad_column, parse_ts, parse_ts_opt, store_err, ts};

pub(crate) fn calendar_from_row(row: &Row<'_>) -> rusqlite::Result<Calendar> {
    let guest: String = row.get("guest_permission")?;
    Ok(Calendar {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        owner_id: row.get("owner_id")?,
        guest_permission: GuestPermission::parse(&guest)
            .ok_or_else(|| bad_column(0, format!("bad guest permission {guest:?}")))?,
        created_at: parse_ts(0, &row.get::<_, String>("created_at")?)?,
    })
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get("role")?;
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        role: Role::parse(&role),
        banned: row.get("banned")?,
        ban_reason: row.get("ban_reason")?,
        ban_expires_at: parse_ts_opt(0, row.get::<_, Option<String>>("ban_expires_at")?.as_deref())?,
        created_at: parse_ts(0, &row.get::<_, String>("created_at")?)?,
    })
}

pub(crate) fn share_from_row(row: &Row<'_>) -> rusqlite::Result<CalendarShare> {
    let permission: String = row.get("permission")?;
    Ok(CalendarShare {
        calendar_id: row.get("calendar_id")?,
        user_id: row.get("user_id")?,
        permission: Permission::parse(&permission)
            .ok_or_else(|| bad_column(0, format!("bad permission {permission:?}")))?,
        shared_by: row.get("shared_by")?,
        shared_at: parse_ts(0, &row.get::<_, String>("shared_at")?)?,
    })
}

pub(crate) fn token_from_row(row: &Row<'_>) -> rusqlite::Result<AccessToken> {
    let permission: String = row.get("permission")?;
    Ok(AccessToken {
        id: row.get("id")?,
        token: row.get("token")?,
        calendar_id: row.get("calendar_id")?,
        permission: Permission::parse(&permission)
            .ok_or_else(|| bad_column(0, format!("bad permission {permission:?}")))?,
        active: row.get("active")?,
        expires_at: parse_ts_opt(0, row.get::<_, Option<String>>("expires_at")?.as_deref())?,
        use_count: row.get("use_count")?,
        last_used_at: parse_ts_opt(0, row.get::<_, Option<String>>("last_used_at")?.as_deref())?,
        created_at: parse_ts(0, &row.get::<_, String>("created_at")?)?,
    })
}

pub(crate) fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    let status: String = row.get("status")?;
    let source: String = row.get("source")?;
    Ok(Subscription {
        user_id: row.get("user_id")?,
        calendar_id: row.get("calendar_id")?,
        status: SubscriptionStatus::parse(&status)
            .ok_or_else(|| bad_column(0, format!("bad subscription status {status:?}")))?,
        source: SubscriptionSource::parse(&source)
            .ok_or_else(|| bad_column(0, format!("bad subscription source {source:?}")))?,
        updated_at: parse_ts(0, &row.get::<_, String>("updated_at")?)?,
    })
}

impl Store for SqliteStore {
    fn calendar(&self, id: &str) -> Result<Option<Calendar>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM calendars WHERE id = ?1",
            params![id],
            calendar_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    fn user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    fn share(&self, calendar_id: &str, user_id: &str) -> Result<Option<CalendarShare>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM calendar_shares WHERE calendar_id = ?1 AND user_id = ?2",
            params![calendar_id, user_id],
            share_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    fn shares_for_user(&self, user_id: &str) -> Result<Vec<CalendarShare>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM calendar_shares WHERE user_id = ?1 ORDER BY calendar_id")
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![user_id], share_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    fn token_by_value(&self, token: &str) -> Result<Option<AccessToken>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM access_tokens WHERE token = ?1",
            params![token],
            token_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    fn subscription(&self, user_id: &str, calendar_id: &str) -> Result<Option<Subscription>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM subscriptions WHERE user_id = ?1 AND calendar_id = ?2",
            params![user_id, calendar_id],
            subscription_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    fn subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM subscriptions WHERE user_id = ?1 ORDER BY calendar_id")
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![user_id], subscription_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    fn calendars_owned_by(&self, user_id: &str) -> Result<Vec<Calendar>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM calendars WHERE owner_id = ?1 ORDER BY name")
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![user_id], calendar_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    fn guest_visible_calendars(&self) -> Result<Vec<Calendar>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM calendars
                 WHERE owner_id IS NOT NULL AND guest_permission != 'none'
                 ORDER BY name",
            )
            .map_err(store_err)?;
        let rows = stmt.query_map([], calendar_from_row).map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO subscriptions (user_id, calendar_id, status, source, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (user_id, calendar_id) DO UPDATE
             SET status = ?3, source = ?4, updated_at = ?5",
            params![
                subscription.user_id,
                subscription.calendar_id,
                subscription.status.as_str(),
                subscription.source.as_str(),
                ts(subscription.updated_at),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn record_token_usage(&self, token_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE access_tokens
             SET use_count = use_count + 1, last_used_at = ?2
             WHERE id = ?1",
            params![token_id, ts(Utc::now())],
        )
        .map_err(store_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::temp_store;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use shiftcal_core::{
        GuestPermission, Permission, Store, Subscription, SubscriptionSource, SubscriptionStatus,
    };

    #[test]
    fn calendar_round_trips() {
        let (_dir, store) = temp_store();
        let user = store.create_user("alice", "secret").unwrap();
        let calendar = store
            .create_calendar("Ward A", "#ff0000", Some(&user.id))
            .unwrap();

        let fetched = store.calendar(&calendar.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Ward A");
        assert_eq!(fetched.owner_id.as_deref(), Some(user.id.as_str()));
        assert_eq!(fetched.guest_permission, GuestPermission::None);
        assert!(store.calendar("missing").unwrap().is_none());
    }

    #[test]
    fn guest_visible_excludes_private_and_orphaned() {
        let (_dir, store) = temp_store();
        let user = store.create_user("alice", "secret").unwrap();
        let public = store
            .create_calendar("Public", "#ff0000", Some(&user.id))
            .unwrap();
        store
            .set_guest_permission(&public.id, GuestPermission::Read)
            .unwrap();
        store
            .create_calendar("Private", "#00ff00", Some(&user.id))
            .unwrap();
        let orphan = store.create_calendar("Orphan", "#0000ff", None).unwrap();
        store
            .set_guest_permission(&orphan.id, GuestPermission::Read)
            .unwrap();

        let visible = store.guest_visible_calendars().unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, public.id);
    }

    #[test]
    fn subscription_upsert_replaces() {
        let (_dir, store) = temp_store();
        let user = store.create_user("alice", "secret").unwrap();
        let owner = store.create_user("bob", "secret").unwrap();
        let calendar = store
            .create_calendar("Ward A", "#ff0000", Some(&owner.id))
            .unwrap();

        for status in [SubscriptionStatus::Subscribed, SubscriptionStatus::Dismissed] {
            store
                .upsert_subscription(&Subscription {
                    user_id: user.id.clone(),
                    calendar_id: calendar.id.clone(),
                    status,
                    source: SubscriptionSource::Guest,
                    updated_at: Utc::now(),
                })
                .unwrap();
        }

        let sub = store.subscription(&user.id, &calendar.id).unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Dismissed);
        assert_eq!(store.subscriptions_for_user(&user.id).unwrap().len(), 1);
    }

    #[test]
    fn token_usage_is_recorded() {
        let (_dir, store) = temp_store();
        let user = store.create_user("alice", "secret").unwrap();
        let calendar = store
            .create_calendar("Ward A", "#ff0000", Some(&user.id))
            .unwrap();
        let token = store
            .create_token(&calendar.id, Permission::Read, None)
            .unwrap();

        store.record_token_usage(&token.id).unwrap();
        store.record_token_usage(&token.id).unwrap();

        let fetched = store.token_by_value(&token.token).unwrap().unwrap();
        assert_eq!(fetched.use_count, 2);
        assert!(fetched.last_used_at.is_some());
    }
}
