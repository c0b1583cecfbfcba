//! Permission and role enums.
//!
//! Calendar access is a single level out of `owner > admin > write > read`.
//! Guest (anonymous) access is configured per calendar and can only grant
//! `read` or `write`. Site-wide roles are a separate axis used by the admin
//! predicates in [`crate::admin`].

use serde::{Deserialize, Serialize};

/// Effective permission on one calendar, ordered `Owner > Admin > Write > Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Owner,
    Admin,
    Write,
    Read,
}

impl Permission {
    /// Higher rank = more privilege.
    fn rank(self) -> u8 {
        match self {
            Permission::Owner => 3,
            Permission::Admin => 2,
            Permission::Write => 1,
            Permission::Read => 0,
        }
    }

    /// True when this permission grants at least `required`.
    pub fn satisfies(self, required: Permission) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Owner => "owner",
            Permission::Admin => "admin",
            Permission::Write => "write",
            Permission::Read => "read",
        }
    }

    /// Parse a stored permission string. Unknown values parse to `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Permission::Owner),
            "admin" => Some(Permission::Admin),
            "write" => Some(Permission::Write),
            "read" => Some(Permission::Read),
            _ => None,
        }
    }
}

/// Per-calendar anonymous access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestPermission {
    #[default]
    None,
    Read,
    Write,
}

impl GuestPermission {
    /// The calendar permission this guest setting grants, if any.
    pub fn as_permission(self) -> Option<Permission> {
        match self {
            GuestPermission::None => None,
            GuestPermission::Read => Some(Permission::Read),
            GuestPermission::Write => Some(Permission::Write),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GuestPermission::None => "none",
            GuestPermission::Read => "read",
            GuestPermission::Write => "write",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(GuestPermission::None),
            "read" => Some(GuestPermission::Read),
            "write" => Some(GuestPermission::Write),
            _ => None,
        }
    }
}

/// Site-wide role. A closed enum so admin predicates can match exhaustively;
/// anything unrecognized deserializes to `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperAdmin,
    // serde requires the catch-all variant to come last.
    #[default]
    #[serde(other)]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Parse a stored role string. Unknown or missing roles are plain users.
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "super_admin" | "superadmin" => Role::SuperAdmin,
            _ => Role::User,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_ordering() {
        assert!(Permission::Owner.satisfies(Permission::Read));
        assert!(Permission::Owner.satisfies(Permission::Owner));
        assert!(Permission::Admin.satisfies(Permission::Write));
        assert!(Permission::Write.satisfies(Permission::Write));
        assert!(!Permission::Write.satisfies(Permission::Admin));
        assert!(!Permission::Read.satisfies(Permission::Write));
    }

    #[test]
    fn guest_permission_grants() {
        assert_eq!(GuestPermission::None.as_permission(), None);
        assert_eq!(GuestPermission::Read.as_permission(), Some(Permission::Read));
        assert_eq!(
            GuestPermission::Write.as_permission(),
            Some(Permission::Write)
        );
    }

    #[test]
    fn unknown_role_is_plain_user() {
        assert_eq!(Role::parse("moderator"), Role::User);
        assert_eq!(Role::parse(""), Role::User);
        assert_eq!(Role::parse("super_admin"), Role::SuperAdmin);
    }

    #[test]
    fn role_serde_defaults_unknown_to_user() {
        assert_eq!(
            serde_json::from_str::<Role>("\"moderator\"").unwrap(),
            Role::User
        );
        for (role, json) in [
            (Role::User, "\"user\""),
            (Role::Admin, "\"admin\""),
            (Role::SuperAdmin, "\"super_admin\""),
        ] {
            assert_eq!(serde_json::to_string(&role).unwrap(), json);
            assert_eq!(serde_json::from_str::<Role>(json).unwrap(), role);
        }
    }

    #[test]
    fn permission_round_trips_through_strings() {
        for p in [
            Permission::Owner,
            Permission::Admin,
            Permission::Write,
            Permission::Read,
        ] {
            assert_eq!(Permission::parse(p.as_str()), Some(p));
        }
        assert_eq!(Permission::parse("root"), None);
    }
}
