//! Calendar permission resolution.
//!
//! One function decides what a caller may do with a calendar. The ladder is
//! strict precedence, evaluated top to bottom, first match wins:
//!
//! 1. missing or orphaned calendar -> no access, before any identity logic
//! 2. anonymous: presented token, then global guest access
//! 3. authenticated: ownership, then share, then presented token, then
//!    subscribed public calendar
//!
//! Ownership and explicit shares are never shadowed by a broader guest
//! grant; tokens sit between shares and guest access because they are a
//! deliberate scoped grant, not blanket policy.

use chrono::Utc;
use serde::Deserialize;

use crate::calendar::SubscriptionStatus;
use crate::error::Result;
use crate::permission::Permission;
use crate::store::Store;
use crate::token::TokenContext;

/// Site-wide access policy, injected at construction. Resolution is a pure
/// function of (policy, identity, tokens, store-snapshot); nothing is read
/// from process-global state.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AccessPolicy {
    /// When false the server runs without accounts; every caller is a guest.
    pub auth_enabled: bool,
    /// Global switch for anonymous access to calendars with a guest
    /// permission. Does not affect authenticated subscribers.
    pub allow_guest_access: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        AccessPolicy {
            auth_enabled: true,
            allow_guest_access: false,
        }
    }
}

/// Resolves effective calendar permissions under one [`AccessPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    policy: AccessPolicy,
}

impl Resolver {
    pub fn new(policy: AccessPolicy) -> Self {
        Resolver { policy }
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Effective permission of `identity` (or an anonymous caller) on
    /// `calendar_id`. `None` means no access; missing and orphaned
    /// calendars are indistinguishable from inaccessible ones.
    pub fn resolve(
        &self,
        store: &dyn Store,
        identity: Option<&str>,
        tokens: &TokenContext,
        calendar_id: &str,
    ) -> Result<Option<Permission>> {
        let now = Utc::now();

        // Orphaned calendars are invisible to every non-admin path,
        // regardless of shares, tokens, or guest settings.
        let Some(calendar) = store.calendar(calendar_id)? else {
            return Ok(None);
        };
        if calendar.is_orphaned() {
            return Ok(None);
        }

        let Some(user_id) = identity else {
            if let Some(token) = tokens.validate_for(store, calendar_id, now)? {
                return Ok(Some(token.permission));
            }
            if self.policy.allow_guest_access {
                return Ok(calendar.guest_permission.as_permission());
            }
            return Ok(None);
        };

        if calendar.owner_id.as_deref() == Some(user_id) {
            return Ok(Some(Permission::Owner));
        }

        if let Some(share) = store.share(calendar_id, user_id)? {
            return Ok(Some(share.permission));
        }

        if let Some(token) = tokens.validate_for(store, calendar_id, now)? {
            return Ok(Some(token.permission));
        }

        // A subscribed user keeps access to a public calendar even when the
        // global guest toggle is off.
        if let Some(sub) = store.subscription(user_id, calendar_id)? {
            if sub.status == SubscriptionStatus::Subscribed {
                return Ok(calendar.guest_permission.as_permission());
            }
        }

        Ok(None)
    }

    /// True when the caller's resolved permission grants at least `required`.
    pub fn check(
        &self,
        store: &dyn Store,
        identity: Option<&str>,
        tokens: &TokenContext,
        calendar_id: &str,
        required: Permission,
    ) -> Result<bool> {
        Ok(self
            .resolve(store, identity, tokens, calendar_id)?
            .is_some_and(|p| p.satisfies(required)))
    }
}
