//! Calendar CRUD and the per-user visibility operations.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use shiftcal_core::{ChangeKind, GuestPermission, Permission, Store, subscription};

use super::require;
use crate::error::ApiError;
use crate::identity::{Identity, TokenCookie};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendars", get(list).post(create))
        .route(
            "/calendars/{id}",
            get(show).put(update).delete(delete_calendar),
        )
        .route("/calendars/{id}/transfer", post(transfer))
        .route("/calendars/{id}/dismiss", post(dismiss))
        .route("/calendars/{id}/subscribe", post(subscribe))
}

/// Everything the caller can see, with effective permissions.
async fn list(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
) -> Result<impl IntoResponse, ApiError> {
    let accessible =
        state
            .resolver
            .list_accessible(&state.store, identity.user_id(), &tokens.context())?;
    Ok(Json(json!({ "calendars": accessible })))
}

#[derive(Deserialize)]
struct CreateCalendarBody {
    name: String,
    #[serde(default = "default_color")]
    color: String,
}

fn default_color() -> String {
    "#3b82f6".to_string()
}

async fn create(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateCalendarBody>,
) -> Result<impl IntoResponse, ApiError> {
    let user = identity.require()?;
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Calendar name is required".to_string()));
    }

    let calendar = state
        .store
        .create_calendar(body.name.trim(), &body.color, Some(&user.id))?;
    state.audit(
        Some(&user.id),
        "calendar.create",
        Some(&calendar.id),
        Some(&calendar.name),
    );
    Ok(Json(json!({ "calendar": calendar })))
}

async fn show(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let permission = require(&state, &identity, &tokens.context(), &id, Permission::Read)?;
    let calendar = state
        .store
        .calendar(&id)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "calendar": calendar, "permission": permission })))
}

#[derive(Deserialize)]
struct UpdateCalendarBody {
    name: String,
    color: String,
    guest_permission: GuestPermission,
}

async fn update(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Json(body): Json<UpdateCalendarBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    state
        .store
        .update_calendar(&id, body.name.trim(), &body.color, body.guest_permission)?;
    state.audit(identity.user_id(), "calendar.update", Some(&id), None);
    state.publish(&id, ChangeKind::Calendar);

    let calendar = state
        .store
        .calendar(&id)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "calendar": calendar })))
}

async fn delete_calendar(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Owner)?;
    state.store.delete_calendar(&id)?;
    state.audit(identity.user_id(), "calendar.delete", Some(&id), None);
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
struct TransferBody {
    owner_id: String,
}

/// Hand the calendar to another account. Owner only; the previous owner
/// keeps nothing unless the new owner shares it back.
async fn transfer(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Json(body): Json<TransferBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Owner)?;
    if state.store.user(&body.owner_id)?.is_none() {
        return Err(ApiError::NotFound);
    }
    state.store.set_owner(&id, &body.owner_id)?;
    state.audit(identity.user_id(), "calendar.transfer", Some(&id), Some(&body.owner_id));
    state.publish(&id, ChangeKind::Calendar);
    Ok(Json(json!({ "ok": true })))
}

/// Hide a shared or subscribed calendar from the caller's own view.
async fn dismiss(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = identity.require()?;
    subscription::dismiss(&state.store, &user.id, &id)?;
    Ok(Json(json!({ "ok": true })))
}

/// Re-show a dismissed calendar, or subscribe to a public one.
async fn subscribe(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = identity.require()?;
    subscription::undismiss(&state.store, &user.id, &id)?;
    Ok(Json(json!({ "ok": true })))
}
