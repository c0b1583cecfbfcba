//! Role-based admin predicates.
//!
//! Pure, deterministic functions over acting and target users, independent
//! of calendar permissions. These are the single source of truth: API
//! routes gate mutations with them and the UI decides button visibility
//! with the same functions, so the two can never diverge.

use crate::permission::Role;
use crate::user::User;

pub fn is_admin(user: &User) -> bool {
    match user.role {
        Role::Admin | Role::SuperAdmin => true,
        Role::User => false,
    }
}

pub fn is_super_admin(user: &User) -> bool {
    match user.role {
        Role::SuperAdmin => true,
        Role::Admin | Role::User => false,
    }
}

/// Superadmins edit anyone; admins only plain users.
pub fn can_edit_user(actor: &User, target: &User) -> bool {
    match actor.role {
        Role::SuperAdmin => true,
        Role::Admin => target.role == Role::User,
        Role::User => false,
    }
}

/// Superadmin only, never self.
pub fn can_delete_user(actor: &User, target: &User) -> bool {
    is_super_admin(actor) && actor.id != target.id
}

/// Superadmin only, never self, and superadmins cannot be banned.
pub fn can_ban_user(actor: &User, target: &User) -> bool {
    is_super_admin(actor) && actor.id != target.id && target.role != Role::SuperAdmin
}

/// Superadmin only, never self.
pub fn can_change_user_role(actor: &User, target: &User) -> bool {
    is_super_admin(actor) && actor.id != target.id
}

/// Any admin, never self; admins cannot reset a superadmin's password.
pub fn can_reset_password(actor: &User, target: &User) -> bool {
    if actor.id == target.id {
        return false;
    }
    match actor.role {
        Role::SuperAdmin => true,
        Role::Admin => target.role != Role::SuperAdmin,
        Role::User => false,
    }
}

pub fn can_edit_calendar(actor: &User) -> bool {
    is_admin(actor)
}

pub fn can_transfer_calendar(actor: &User) -> bool {
    is_admin(actor)
}

pub fn can_assign_orphaned_calendar(actor: &User) -> bool {
    is_admin(actor)
}

pub fn can_delete_calendar(actor: &User) -> bool {
    is_super_admin(actor)
}

pub fn can_view_audit_logs(actor: &User) -> bool {
    is_admin(actor)
}

pub fn can_delete_audit_logs(actor: &User) -> bool {
    is_super_admin(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            role,
            banned: false,
            ban_reason: None,
            ban_expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn admin_edits_only_plain_users() {
        let admin = user("a", Role::Admin);
        assert!(can_edit_user(&admin, &user("u", Role::User)));
        assert!(!can_edit_user(&admin, &user("b", Role::Admin)));
        assert!(!can_edit_user(&admin, &user("s", Role::SuperAdmin)));
    }

    #[test]
    fn super_admin_edits_anyone() {
        let sa = user("s", Role::SuperAdmin);
        assert!(can_edit_user(&sa, &user("u", Role::User)));
        assert!(can_edit_user(&sa, &user("a", Role::Admin)));
        assert!(can_edit_user(&sa, &user("s2", Role::SuperAdmin)));
    }

    #[test]
    fn only_super_admin_deletes_and_never_self() {
        let sa = user("s", Role::SuperAdmin);
        let admin = user("a", Role::Admin);
        assert!(can_delete_user(&sa, &user("u", Role::User)));
        assert!(!can_delete_user(&sa, &user("s", Role::SuperAdmin)));
        assert!(!can_delete_user(&admin, &user("u", Role::User)));
    }

    #[test]
    fn ban_rules() {
        let sa = user("s", Role::SuperAdmin);
        let admin = user("a", Role::Admin);
        // Admins can never ban, not even plain users.
        assert!(!can_ban_user(&admin, &user("u", Role::User)));
        // Superadmin targets are unbannable.
        assert!(!can_ban_user(&sa, &user("s2", Role::SuperAdmin)));
        // No self-ban.
        assert!(!can_ban_user(&sa, &user("s", Role::User)));
        assert!(can_ban_user(&sa, &user("u", Role::User)));
        assert!(can_ban_user(&sa, &user("a", Role::Admin)));
    }

    #[test]
    fn password_reset_rules() {
        let sa = user("s", Role::SuperAdmin);
        let admin = user("a", Role::Admin);
        let plain = user("u", Role::User);
        assert!(can_reset_password(&admin, &plain));
        assert!(can_reset_password(&admin, &user("a2", Role::Admin)));
        assert!(!can_reset_password(&admin, &sa));
        assert!(can_reset_password(&sa, &user("s2", Role::SuperAdmin)));
        assert!(!can_reset_password(&sa, &user("s", Role::SuperAdmin)));
        assert!(!can_reset_password(&plain, &user("u2", Role::User)));
        assert!(!can_reset_password(&admin, &user("a", Role::Admin)));
    }

    #[test]
    fn calendar_and_audit_ops_split_by_rank() {
        let sa = user("s", Role::SuperAdmin);
        let admin = user("a", Role::Admin);
        let plain = user("u", Role::User);

        for actor in [&sa, &admin] {
            assert!(can_edit_calendar(actor));
            assert!(can_transfer_calendar(actor));
            assert!(can_assign_orphaned_calendar(actor));
            assert!(can_view_audit_logs(actor));
        }
        assert!(!can_edit_calendar(&plain));
        assert!(!can_view_audit_logs(&plain));

        assert!(can_delete_calendar(&sa));
        assert!(!can_delete_calendar(&admin));
        assert!(can_delete_audit_logs(&sa));
        assert!(!can_delete_audit_logs(&admin));
    }

    #[test]
    fn role_change_rules() {
        let sa = user("s", Role::SuperAdmin);
        let admin = user("a", Role::Admin);
        assert!(can_change_user_role(&sa, &user("u", Role::User)));
        assert!(!can_change_user_role(&sa, &user("s", Role::SuperAdmin)));
        assert!(!can_change_user_role(&admin, &user("u", Role::User)));
    }
}
