//! Calendar, share, and access token persistence.

use chrono::{DateTime, Utc};
use rusqlite::params;
use shiftcal_core::{
    AccessToken, Calendar, CalendarShare, Error, GuestPermission, Permission, Result,
};
use uuid::Uuid;

use super::access::{calendar_from_row, share_from_row, token_from_row};
use super::users::random_hex;
use super::{SqliteStore, store_err, ts, ts_opt};

impl SqliteStore {
    pub fn create_calendar(
        &self,
        name: &str,
        color: &str,
        owner_id: Option<&str>,
    ) -> Result<Calendar> {
        let conn = self.conn()?;
        let calendar = Calendar {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: color.to_string(),
            owner_id: owner_id.map(str::to_string),
            guest_permission: GuestPermission::None,
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO calendars (id, name, color, owner_id, guest_permission, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                calendar.id,
                calendar.name,
                calendar.color,
                calendar.owner_id,
                calendar.guest_permission.as_str(),
                ts(calendar.created_at),
            ],
        )
        .map_err(store_err)?;
        Ok(calendar)
    }

    pub fn update_calendar(
        &self,
        calendar_id: &str,
        name: &str,
        color: &str,
        guest_permission: GuestPermission,
    ) -> Result<()> {
        self.update_row(
            calendar_id,
            "UPDATE calendars SET name = ?2, color = ?3, guest_permission = ?4 WHERE id = ?1",
            params![calendar_id, name, color, guest_permission.as_str()],
        )
    }

    pub fn set_guest_permission(
        &self,
        calendar_id: &str,
        guest_permission: GuestPermission,
    ) -> Result<()> {
        self.update_row(
            calendar_id,
            "UPDATE calendars SET guest_permission = ?2 WHERE id = ?1",
            params![calendar_id, guest_permission.as_str()],
        )
    }

    /// Reassign ownership, including claiming an orphaned calendar.
    /// The new owner's share and subscription rows are dropped: those
    /// tables only describe non-owned calendars, and a leftover dismissal
    /// must not follow the user into ownership.
    pub fn set_owner(&self, calendar_id: &str, owner_id: &str) -> Result<()> {
        self.update_row(
            calendar_id,
            "UPDATE calendars SET owner_id = ?2 WHERE id = ?1",
            params![calendar_id, owner_id],
        )?;
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM calendar_shares WHERE calendar_id = ?1 AND user_id = ?2",
            params![calendar_id, owner_id],
        )
        .map_err(store_err)?;
        conn.execute(
            "DELETE FROM subscriptions WHERE calendar_id = ?1 AND user_id = ?2",
            params![calendar_id, owner_id],
        )
        .map_err(store_err)?;
        Ok(())
    }

    pub fn delete_calendar(&self, calendar_id: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM calendars WHERE id = ?1", params![calendar_id])
            .map_err(store_err)?;
        if changed == 0 {
            return Err(Error::CalendarNotFound(calendar_id.to_string()));
        }
        Ok(())
    }

    /// Every calendar, orphaned ones included. Admin surface only.
    pub fn list_all_calendars(&self) -> Result<Vec<Calendar>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM calendars ORDER BY name")
            .map_err(store_err)?;
        let rows = stmt.query_map([], calendar_from_row).map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    fn update_row(&self, calendar_id: &str, sql: &str, params: impl rusqlite::Params) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(sql, params).map_err(store_err)?;
        if changed == 0 {
            return Err(Error::CalendarNotFound(calendar_id.to_string()));
        }
        Ok(())
    }

    // ==================== Shares ====================

    /// Grant or update a share. One row per (calendar, user).
    pub fn upsert_share(&self, share: &CalendarShare) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO calendar_shares (calendar_id, user_id, permission, shared_by, shared_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (calendar_id, user_id) DO UPDATE
             SET permission = ?3, shared_by = ?4, shared_at = ?5",
            params![
                share.calendar_id,
                share.user_id,
                share.permission.as_str(),
                share.shared_by,
                ts(share.shared_at),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    pub fn remove_share(&self, calendar_id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "DELETE FROM calendar_shares WHERE calendar_id = ?1 AND user_id = ?2",
                params![calendar_id, user_id],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    pub fn shares_for_calendar(&self, calendar_id: &str) -> Result<Vec<CalendarShare>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM calendar_shares WHERE calendar_id = ?1 ORDER BY user_id")
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![calendar_id], share_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    // ==================== Access tokens ====================

    pub fn create_token(
        &self,
        calendar_id: &str,
        permission: Permission,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessToken> {
        let conn = self.conn()?;
        let token = AccessToken {
            id: Uuid::new_v4().to_string(),
            token: random_hex(24),
            calendar_id: calendar_id.to_string(),
            permission,
            active: true,
            expires_at,
            use_count: 0,
            last_used_at: None,
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO access_tokens (id, token, calendar_id, permission, active, expires_at, use_count, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, 0, ?6)",
            params![
                token.id,
                token.token,
                token.calendar_id,
                token.permission.as_str(),
                ts_opt(token.expires_at),
                ts(token.created_at),
            ],
        )
        .map_err(store_err)?;
        Ok(token)
    }

    pub fn tokens_for_calendar(&self, calendar_id: &str) -> Result<Vec<AccessToken>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM access_tokens WHERE calendar_id = ?1 ORDER BY created_at")
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![calendar_id], token_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    /// Deactivate without deleting, so usage history survives.
    pub fn set_token_active(&self, token_id: &str, active: bool) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE access_tokens SET active = ?2 WHERE id = ?1",
                params![token_id, active],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    pub fn delete_token(&self, token_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM access_tokens WHERE id = ?1", params![token_id])
            .map_err(store_err)?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::temp_store;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use shiftcal_core::{
        CalendarShare, Permission, Store, Subscription, SubscriptionSource, SubscriptionStatus,
    };

    #[test]
    fn share_upsert_updates_permission() {
        let (_dir, store) = temp_store();
        let owner = store.create_user("owner", "x").unwrap();
        let member = store.create_user("member", "x").unwrap();
        let calendar = store
            .create_calendar("Ward A", "#ff0000", Some(&owner.id))
            .unwrap();

        for permission in [Permission::Read, Permission::Write] {
            store
                .upsert_share(&CalendarShare {
                    calendar_id: calendar.id.clone(),
                    user_id: member.id.clone(),
                    permission,
                    shared_by: owner.id.clone(),
                    shared_at: Utc::now(),
                })
                .unwrap();
        }

        let share = store.share(&calendar.id, &member.id).unwrap().unwrap();
        assert_eq!(share.permission, Permission::Write);
        assert_eq!(store.shares_for_calendar(&calendar.id).unwrap().len(), 1);
    }

    #[test]
    fn ownership_change_drops_new_owners_grants() {
        let (_dir, store) = temp_store();
        let owner = store.create_user("owner", "x").unwrap();
        let heir = store.create_user("heir", "x").unwrap();
        let calendar = store
            .create_calendar("Ward A", "#ff0000", Some(&owner.id))
            .unwrap();
        store
            .upsert_share(&CalendarShare {
                calendar_id: calendar.id.clone(),
                user_id: heir.id.clone(),
                permission: Permission::Read,
                shared_by: owner.id.clone(),
                shared_at: Utc::now(),
            })
            .unwrap();
        store
            .upsert_subscription(&Subscription {
                user_id: heir.id.clone(),
                calendar_id: calendar.id.clone(),
                status: SubscriptionStatus::Dismissed,
                source: SubscriptionSource::Shared,
                updated_at: Utc::now(),
            })
            .unwrap();

        store.set_owner(&calendar.id, &heir.id).unwrap();

        let fetched = store.calendar(&calendar.id).unwrap().unwrap();
        assert_eq!(fetched.owner_id.as_deref(), Some(heir.id.as_str()));
        // Shares and subscriptions only describe non-owned calendars.
        assert!(store.share(&calendar.id, &heir.id).unwrap().is_none());
        assert!(store.subscription(&heir.id, &calendar.id).unwrap().is_none());
    }

    #[test]
    fn deactivated_token_is_kept() {
        let (_dir, store) = temp_store();
        let owner = store.create_user("owner", "x").unwrap();
        let calendar = store
            .create_calendar("Ward A", "#ff0000", Some(&owner.id))
            .unwrap();
        let token = store
            .create_token(&calendar.id, Permission::Read, None)
            .unwrap();

        assert!(store.set_token_active(&token.id, false).unwrap());
        let fetched = store.token_by_value(&token.token).unwrap().unwrap();
        assert!(!fetched.active);

        assert!(store.delete_token(&token.id).unwrap());
        assert!(!store.delete_token(&token.id).unwrap());
    }

    #[test]
    fn deleting_calendar_cascades() {
        let (_dir, store) = temp_store();
        let owner = store.create_user("owner", "x").unwrap();
        let calendar = store
            .create_calendar("Ward A", "#ff0000", Some(&owner.id))
            .unwrap();
        let token = store
            .create_token(&calendar.id, Permission::Read, None)
            .unwrap();

        store.delete_calendar(&calendar.id).unwrap();
        assert!(store.calendar(&calendar.id).unwrap().is_none());
        assert!(store.token_by_value(&token.token).unwrap().is_none());
    }
}
