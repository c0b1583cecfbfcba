//! Site administration. Gated by the role predicates in the core crate,
//! the same ones a frontend uses to decide what to show; routes answer 403
//! when the predicate says no.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use shiftcal_core::{Role, Store, User, admin};

use crate::error::ApiError;
use crate::identity::Identity;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/role", put(set_role))
        .route("/users/{id}/ban", post(ban).delete(unban))
        .route("/users/{id}/password", post(reset_password))
        .route("/calendars", get(list_calendars))
        .route("/calendars/{id}", delete(delete_calendar))
        .route("/calendars/{id}/transfer", post(transfer))
        .route("/calendars/{id}/assign", post(assign))
        .route("/audit", get(list_audit).delete(clear_audit))
}

fn require_admin(identity: &Identity) -> Result<&User, ApiError> {
    let user = identity.require()?;
    if !admin::is_admin(user) {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

// ==================== Users ====================

async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&identity)?;
    Ok(Json(json!({ "users": state.store.list_users()? })))
}

fn target_user(state: &AppState, id: &str) -> Result<User, ApiError> {
    state.store.user(id)?.ok_or(ApiError::NotFound)
}

#[derive(Deserialize)]
struct RoleBody {
    role: Role,
}

async fn set_role(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<RoleBody>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    let target = target_user(&state, &id)?;
    if !admin::can_change_user_role(actor, &target) {
        return Err(ApiError::Forbidden);
    }
    state.store.set_role(&id, body.role)?;
    state.audit(Some(&actor.id), "user.role", Some(&id), Some(body.role.as_str()));
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
struct BanBody {
    reason: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

async fn ban(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<BanBody>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    let target = target_user(&state, &id)?;
    if !admin::can_ban_user(actor, &target) {
        return Err(ApiError::Forbidden);
    }
    state
        .store
        .set_ban(&id, body.reason.as_deref(), body.expires_at)?;
    state.audit(Some(&actor.id), "user.ban", Some(&id), body.reason.as_deref());
    Ok(Json(json!({ "ok": true })))
}

async fn unban(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    let target = target_user(&state, &id)?;
    if !admin::can_ban_user(actor, &target) {
        return Err(ApiError::Forbidden);
    }
    state.store.clear_ban(&id)?;
    state.audit(Some(&actor.id), "user.unban", Some(&id), None);
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
struct PasswordBody {
    password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<PasswordBody>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    let target = target_user(&state, &id)?;
    if !admin::can_reset_password(actor, &target) {
        return Err(ApiError::Forbidden);
    }
    if body.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    state.store.reset_password(&id, &body.password)?;
    state.audit(Some(&actor.id), "user.password_reset", Some(&id), None);
    Ok(Json(json!({ "ok": true })))
}

async fn delete_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    let target = target_user(&state, &id)?;
    if !admin::can_delete_user(actor, &target) {
        return Err(ApiError::Forbidden);
    }
    state.store.delete_user(&id)?;
    state.audit(Some(&actor.id), "user.delete", Some(&id), Some(&target.username));
    Ok(Json(json!({ "ok": true })))
}

// ==================== Calendars ====================

/// All calendars including orphaned ones, which are invisible everywhere
/// else.
async fn list_calendars(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&identity)?;
    Ok(Json(json!({ "calendars": state.store.list_all_calendars()? })))
}

#[derive(Deserialize)]
struct OwnerBody {
    owner_id: String,
}

async fn transfer(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<OwnerBody>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    if !admin::can_transfer_calendar(actor) {
        return Err(ApiError::Forbidden);
    }
    if state.store.calendar(&id)?.is_none() {
        return Err(ApiError::NotFound);
    }
    target_user(&state, &body.owner_id)?;
    state.store.set_owner(&id, &body.owner_id)?;
    state.audit(Some(&actor.id), "calendar.transfer", Some(&id), Some(&body.owner_id));
    Ok(Json(json!({ "ok": true })))
}

/// Give an orphaned calendar a new owner. Unlike transfer this never moves
/// a calendar away from a live account.
async fn assign(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<OwnerBody>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    if !admin::can_assign_orphaned_calendar(actor) {
        return Err(ApiError::Forbidden);
    }
    let calendar = state.store.calendar(&id)?.ok_or(ApiError::NotFound)?;
    if !calendar.is_orphaned() {
        return Err(ApiError::BadRequest(
            "Calendar already has an owner".to_string(),
        ));
    }
    target_user(&state, &body.owner_id)?;
    state.store.set_owner(&id, &body.owner_id)?;
    state.audit(Some(&actor.id), "calendar.assign", Some(&id), Some(&body.owner_id));
    Ok(Json(json!({ "ok": true })))
}

async fn delete_calendar(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    if !admin::can_delete_calendar(actor) {
        return Err(ApiError::Forbidden);
    }
    if state.store.calendar(&id)?.is_none() {
        return Err(ApiError::NotFound);
    }
    state.store.delete_calendar(&id)?;
    state.audit(Some(&actor.id), "calendar.delete", Some(&id), None);
    Ok(Json(json!({ "ok": true })))
}

// ==================== Audit ====================

#[derive(Deserialize)]
struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    limit: i64,
}

fn default_audit_limit() -> i64 {
    100
}

async fn list_audit(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    if !admin::can_view_audit_logs(actor) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(json!({ "entries": state.store.list_audit(query.limit)? })))
}

async fn clear_audit(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_admin(&identity)?;
    if !admin::can_delete_audit_logs(actor) {
        return Err(ApiError::Forbidden);
    }
    let removed = state.store.clear_audit()?;
    state.audit(Some(&actor.id), "audit.clear", None, Some(&removed.to_string()));
    Ok(Json(json!({ "removed": removed })))
}
