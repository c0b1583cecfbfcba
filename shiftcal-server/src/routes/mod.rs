//! HTTP API.
//!
//! Every calendar-scoped route resolves the caller's permission first.
//! Reads answer 404 when resolution yields nothing, so inaccessible and
//! nonexistent calendars are indistinguishable; mutations answer 403 when
//! the calendar is visible but the grant is too weak.

mod admin;
mod auth;
mod calendars;
mod notes;
mod presets;
mod shares;
mod shifts;
mod stream;
mod sync;
mod tokens;

use axum::Router;
use serde::Deserialize;
use shiftcal_core::{Permission, TokenContext};

use crate::error::ApiError;
use crate::identity::Identity;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(calendars::router())
        .merge(shifts::router())
        .merge(presets::router())
        .merge(notes::router())
        .merge(shares::router())
        .merge(tokens::router())
        .merge(stream::router())
        .merge(sync::router())
        .nest("/admin", admin::router())
}

/// Resolve and gate in one step. Visible-but-insufficient is the only case
/// that answers 403; no access at all answers 404.
pub(crate) fn require(
    state: &AppState,
    identity: &Identity,
    tokens: &TokenContext,
    calendar_id: &str,
    required: Permission,
) -> Result<Permission, ApiError> {
    let resolved = state
        .resolver
        .resolve(&state.store, identity.user_id(), tokens, calendar_id)?;
    match resolved {
        Some(permission) if permission.satisfies(required) => Ok(permission),
        Some(_) => Err(ApiError::Forbidden),
        None => Err(ApiError::NotFound),
    }
}

/// Inclusive date range, used by the shift and note listing endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct DateRange {
    pub from: chrono::NaiveDate,
    pub to: chrono::NaiveDate,
}
