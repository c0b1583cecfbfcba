//! Accessible-calendar enumeration.
//!
//! Builds the full set of calendars a caller can see, each with its
//! effective permission. Deduplicated by calendar id; the first source to
//! claim a calendar wins, in the same precedence order the resolver uses.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use crate::calendar::{Calendar, SubscriptionStatus, SubscriptionSource};
use crate::error::Result;
use crate::permission::Permission;
use crate::resolver::Resolver;
use crate::store::Store;
use crate::token::{TokenContext, validate_token};

/// A calendar the caller can access, with the permission it resolved to.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarAccess {
    pub calendar: Calendar,
    pub permission: Permission,
}

impl Resolver {
    /// Every calendar visible to `identity` (or an anonymous caller).
    ///
    /// Authenticated order: owned, then non-dismissed shares, then
    /// subscribed public calendars, then presented tokens. Owned calendars
    /// are always present and cannot be dismissed; tokens are an
    /// always-effective grant unaffected by dismissal.
    pub fn list_accessible(
        &self,
        store: &dyn Store,
        identity: Option<&str>,
        tokens: &TokenContext,
    ) -> Result<Vec<CalendarAccess>> {
        let now = Utc::now();
        let mut seen: HashSet<String> = HashSet::new();
        let mut result: Vec<CalendarAccess> = Vec::new();

        let push = |result: &mut Vec<CalendarAccess>,
                    seen: &mut HashSet<String>,
                    calendar: Calendar,
                    permission: Permission| {
            if calendar.is_orphaned() {
                return;
            }
            if seen.insert(calendar.id.clone()) {
                result.push(CalendarAccess {
                    calendar,
                    permission,
                });
            }
        };

        let Some(user_id) = identity else {
            for raw in tokens.iter() {
                if let Some(validated) = validate_token(store, raw, now)? {
                    if let Some(calendar) = store.calendar(&validated.calendar_id)? {
                        push(&mut result, &mut seen, calendar, validated.permission);
                    }
                }
            }
            if self.policy().allow_guest_access {
                for calendar in store.guest_visible_calendars()? {
                    let Some(permission) = calendar.guest_permission.as_permission() else {
                        continue;
                    };
                    push(&mut result, &mut seen, calendar, permission);
                }
            }
            return Ok(result);
        };

        // 1. Owned calendars: always visible, dismiss-proof.
        for calendar in store.calendars_owned_by(user_id)? {
            push(&mut result, &mut seen, calendar, Permission::Owner);
        }

        // 2. Shares, unless the user dismissed the calendar.
        for share in store.shares_for_user(user_id)? {
            let dismissed = store
                .subscription(user_id, &share.calendar_id)?
                .is_some_and(|s| s.status == SubscriptionStatus::Dismissed);
            if dismissed {
                continue;
            }
            if let Some(calendar) = store.calendar(&share.calendar_id)? {
                push(&mut result, &mut seen, calendar, share.permission);
            }
        }

        // 3. Public calendars the user subscribed to, while still public.
        for sub in store.subscriptions_for_user(user_id)? {
            if sub.status != SubscriptionStatus::Subscribed
                || sub.source != SubscriptionSource::Guest
            {
                continue;
            }
            let Some(calendar) = store.calendar(&sub.calendar_id)? else {
                continue;
            };
            let Some(permission) = calendar.guest_permission.as_permission() else {
                continue;
            };
            push(&mut result, &mut seen, calendar, permission);
        }

        // 4. Presented tokens.
        for raw in tokens.iter() {
            if let Some(validated) = validate_token(store, raw, now)? {
                if let Some(calendar) = store.calendar(&validated.calendar_id)? {
                    push(&mut result, &mut seen, calendar, validated.permission);
                }
            }
        }

        Ok(result)
    }
}
