//! Core types and permission resolution for the shiftcal ecosystem.
//!
//! This crate holds everything the server and any future frontends share:
//! - domain records (`User`, `Calendar`, shares, tokens, subscriptions,
//!   shifts, presets, notes)
//! - the permission resolver and accessible-calendar enumerator
//! - subscription (dismiss/undismiss) rules
//! - role-based admin predicates
//!
//! It performs no I/O itself; storage is reached through the [`store::Store`]
//! trait.

pub mod access_list;
pub mod admin;
pub mod audit;
pub mod calendar;
pub mod error;
pub mod permission;
pub mod resolver;
pub mod scheduling;
pub mod store;
pub mod subscription;
pub mod sync;
pub mod token;
pub mod user;

pub use access_list::CalendarAccess;
pub use audit::{AuditEntry, ChangeKind};
pub use calendar::{
    AccessToken, Calendar, CalendarShare, Subscription, SubscriptionSource, SubscriptionStatus,
};
pub use error::{Error, Result};
pub use permission::{GuestPermission, Permission, Role};
pub use resolver::{AccessPolicy, Resolver};
pub use scheduling::{Note, Shift, ShiftPreset};
pub use store::Store;
pub use sync::{ExternalEvent, SyncLogEntry, SyncStatus};
pub use token::{CachedToken, TokenCache, TokenContext, ValidatedToken, validate_token};
pub use user::User;
