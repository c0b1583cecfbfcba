//! Share management. Calendar-admin surface: requires an `admin` grant on
//! the calendar, not a site-wide role.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use shiftcal_core::{CalendarShare, ChangeKind, Permission, Store};

use super::require;
use crate::error::ApiError;
use crate::identity::{Identity, TokenCookie};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendars/{id}/shares", get(list))
        .route(
            "/calendars/{id}/shares/{user_id}",
            axum::routing::put(put_share).delete(delete_share),
        )
}

async fn list(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    let shares = state.store.shares_for_calendar(&id)?;
    Ok(Json(json!({ "shares": shares })))
}

#[derive(Deserialize)]
struct ShareBody {
    permission: Permission,
}

async fn put_share(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path((id, user_id)): Path<(String, String)>,
    Json(body): Json<ShareBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;

    // Shares grant at most admin; ownership moves by transfer, not sharing.
    if body.permission == Permission::Owner {
        return Err(ApiError::BadRequest(
            "Shares cannot grant ownership".to_string(),
        ));
    }

    let calendar = state.store.calendar(&id)?.ok_or(ApiError::NotFound)?;
    if calendar.owner_id.as_deref() == Some(user_id.as_str()) {
        return Err(ApiError::BadRequest(
            "The owner already has full access".to_string(),
        ));
    }
    if state.store.user(&user_id)?.is_none() {
        return Err(ApiError::NotFound);
    }

    let share = CalendarShare {
        calendar_id: id.clone(),
        user_id,
        permission: body.permission,
        shared_by: identity.user_id().unwrap_or_default().to_string(),
        shared_at: Utc::now(),
    };
    state.store.upsert_share(&share)?;
    state.audit(identity.user_id(), "calendar.share", Some(&id), Some(&share.user_id));
    state.publish(&id, ChangeKind::Calendar);
    Ok(Json(json!({ "share": share })))
}

async fn delete_share(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    if !state.store.remove_share(&id, &user_id)? {
        return Err(ApiError::NotFound);
    }
    state.audit(identity.user_id(), "calendar.unshare", Some(&id), Some(&user_id));
    state.publish(&id, ChangeKind::Calendar);
    Ok(Json(json!({ "ok": true })))
}
