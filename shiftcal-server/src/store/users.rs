//! User accounts, credentials, and sessions.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};
use shiftcal_core::{Error, Result, Role, User};
use uuid::Uuid;

use super::access::user_from_row;
use super::{SqliteStore, store_err, ts, ts_opt};

pub(crate) fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl SqliteStore {
    pub fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let conn = self.conn()?;
        let salt = random_hex(16);
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            role: Role::User,
            banned: false,
            ban_reason: None,
            ban_expires_at: None,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO users (id, username, password_hash, salt, role, banned, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                user.id,
                user.username,
                digest(&salt, password),
                salt,
                user.role.as_str(),
                ts(user.created_at),
            ],
        )
        .map_err(|err| match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::InvalidOperation(format!("username {username:?} is taken"))
            }
            other => store_err(other),
        })?;

        Ok(user)
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM users WHERE username = ?1",
            params![username],
            user_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    /// Check a password attempt. Unknown usernames and wrong passwords are
    /// indistinguishable to the caller.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let stored: Option<(String, String)> = conn
            .query_row(
                "SELECT salt, password_hash FROM users WHERE username = ?1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(store_err)?;

        match stored {
            Some((salt, hash)) if digest(&salt, password) == hash => {
                self.user_by_username(username)
            }
            _ => Ok(None),
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM users ORDER BY username")
            .map_err(store_err)?;
        let rows = stmt.query_map([], user_from_row).map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    pub fn set_role(&self, user_id: &str, role: Role) -> Result<()> {
        self.update_user(user_id, "UPDATE users SET role = ?2 WHERE id = ?1", params![
            user_id,
            role.as_str()
        ])
    }

    pub fn set_ban(
        &self,
        user_id: &str,
        reason: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.update_user(
            user_id,
            "UPDATE users SET banned = 1, ban_reason = ?2, ban_expires_at = ?3 WHERE id = ?1",
            params![user_id, reason, ts_opt(expires_at)],
        )?;
        // A ban ends any live sessions immediately.
        let conn = self.conn()?;
        conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])
            .map_err(store_err)?;
        Ok(())
    }

    pub fn clear_ban(&self, user_id: &str) -> Result<()> {
        self.update_user(
            user_id,
            "UPDATE users SET banned = 0, ban_reason = NULL, ban_expires_at = NULL WHERE id = ?1",
            params![user_id],
        )
    }

    pub fn reset_password(&self, user_id: &str, password: &str) -> Result<()> {
        let salt = random_hex(16);
        self.update_user(
            user_id,
            "UPDATE users SET salt = ?2, password_hash = ?3 WHERE id = ?1",
            params![user_id, salt, digest(&salt, password)],
        )
    }

    /// Delete an account. Owned calendars become orphaned via the foreign
    /// key's ON DELETE SET NULL; shares, subscriptions, and sessions cascade.
    pub fn delete_user(&self, user_id: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM users WHERE id = ?1", params![user_id])
            .map_err(store_err)?;
        if changed == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    fn update_user(
        &self,
        user_id: &str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(sql, params).map_err(store_err)?;
        if changed == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    // ==================== Sessions ====================

    pub fn create_session(&self, user_id: &str, ttl: Duration) -> Result<String> {
        let conn = self.conn()?;
        let id = random_hex(32);
        let now = Utc::now();
        conn.execute(
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, user_id, ts(now + ttl), ts(now)],
        )
        .map_err(store_err)?;
        Ok(id)
    }

    /// The user behind a live session, or `None` for unknown/expired ids.
    pub fn session_user(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT u.* FROM users u
             JOIN sessions s ON s.user_id = u.id
             WHERE s.id = ?1 AND s.expires_at > ?2",
            params![session_id, ts(now)],
            user_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    pub fn delete_session(&self, session_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
            .map_err(store_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::temp_store;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use shiftcal_core::{Error, Role, Store};

    #[test]
    fn password_verification() {
        let (_dir, store) = temp_store();
        store.create_user("alice", "hunter2").unwrap();

        assert!(store.verify_password("alice", "hunter2").unwrap().is_some());
        assert!(store.verify_password("alice", "wrong").unwrap().is_none());
        assert!(store.verify_password("nobody", "hunter2").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let (_dir, store) = temp_store();
        store.create_user("alice", "a").unwrap();
        let err = store.create_user("alice", "b").unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn password_reset_invalidates_old_password() {
        let (_dir, store) = temp_store();
        let user = store.create_user("alice", "old").unwrap();
        store.reset_password(&user.id, "new").unwrap();

        assert!(store.verify_password("alice", "old").unwrap().is_none());
        assert!(store.verify_password("alice", "new").unwrap().is_some());
    }

    #[test]
    fn sessions_expire() {
        let (_dir, store) = temp_store();
        let user = store.create_user("alice", "a").unwrap();
        let session = store.create_session(&user.id, Duration::hours(1)).unwrap();

        let now = Utc::now();
        assert!(store.session_user(&session, now).unwrap().is_some());
        assert!(
            store
                .session_user(&session, now + Duration::hours(2))
                .unwrap()
                .is_none()
        );
        assert!(store.session_user("bogus", now).unwrap().is_none());
    }

    #[test]
    fn banning_kills_sessions() {
        let (_dir, store) = temp_store();
        let user = store.create_user("alice", "a").unwrap();
        let session = store.create_session(&user.id, Duration::hours(1)).unwrap();

        store.set_ban(&user.id, Some("spam"), None).unwrap();
        assert!(store.session_user(&session, Utc::now()).unwrap().is_none());

        let banned = store.user(&user.id).unwrap().unwrap();
        assert!(banned.banned);
        assert_eq!(banned.ban_reason.as_deref(), Some("spam"));
    }

    #[test]
    fn deleting_user_orphans_owned_calendars() {
        let (_dir, store) = temp_store();
        let user = store.create_user("alice", "a").unwrap();
        let calendar = store
            .create_calendar("Ward A", "#ff0000", Some(&user.id))
            .unwrap();

        store.delete_user(&user.id).unwrap();
        let orphan = store.calendar(&calendar.id).unwrap().unwrap();
        assert!(orphan.is_orphaned());
    }

    #[test]
    fn role_updates_round_trip() {
        let (_dir, store) = temp_store();
        let user = store.create_user("alice", "a").unwrap();
        store.set_role(&user.id, Role::Admin).unwrap();
        assert_eq!(store.user(&user.id).unwrap().unwrap().role, Role::Admin);

        let err = store.set_role("missing", Role::Admin).unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
    }
}
