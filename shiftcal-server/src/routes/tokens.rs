//! Access token management and redemption.
//!
//! Redemption is the anonymous-friendly entry point: a caller presents a
//! raw token value, the server validates it and answers with a refreshed
//! token-cache cookie. The cookie is only a hint; every later request
//! re-validates the raw values it carries.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use shiftcal_core::{CachedToken, Permission, Store, validate_token};
use tracing::warn;

use super::require;
use crate::error::ApiError;
use crate::identity::{Identity, TOKEN_COOKIE, TokenCookie};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendars/{id}/tokens", get(list).post(create))
        .route(
            "/calendars/{id}/tokens/{token_id}",
            axum::routing::put(set_active).delete(delete_token),
        )
        .route("/tokens/redeem", post(redeem))
}

async fn list(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    let tokens = state.store.tokens_for_calendar(&id)?;
    Ok(Json(json!({ "tokens": tokens })))
}

#[derive(Deserialize)]
struct CreateTokenBody {
    permission: Permission,
    expires_at: Option<DateTime<Utc>>,
}

async fn create(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Json(body): Json<CreateTokenBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    if matches!(body.permission, Permission::Owner | Permission::Admin) {
        return Err(ApiError::BadRequest(
            "Tokens can only grant read or write".to_string(),
        ));
    }
    let token = state.store.create_token(&id, body.permission, body.expires_at)?;
    state.audit(identity.user_id(), "token.create", Some(&id), Some(&token.id));
    Ok(Json(json!({ "token": token })))
}

#[derive(Deserialize)]
struct SetActiveBody {
    active: bool,
}

async fn set_active(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path((id, token_id)): Path<(String, String)>,
    Json(body): Json<SetActiveBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    if !state.store.set_token_active(&token_id, body.active)? {
        return Err(ApiError::NotFound);
    }
    state.audit(identity.user_id(), "token.update", Some(&id), Some(&token_id));
    Ok(Json(json!({ "ok": true })))
}

async fn delete_token(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path((id, token_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    if !state.store.delete_token(&token_id)? {
        return Err(ApiError::NotFound);
    }
    state.audit(identity.user_id(), "token.delete", Some(&id), Some(&token_id));
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
struct RedeemBody {
    token: String,
}

/// Validate a raw token and fold it into the caller's token cookie.
/// Unknown, inactive, and expired tokens all answer 404.
async fn redeem(
    State(state): State<AppState>,
    mut tokens: TokenCookie,
    Json(body): Json<RedeemBody>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = body.token.trim();
    let Some(validated) = validate_token(&state.store, raw, Utc::now())? else {
        return Err(ApiError::NotFound);
    };

    // Usage metrics are best-effort and must never fail the redeem.
    if let Err(err) = state.store.record_token_usage(&validated.token_id) {
        warn!("failed to record token usage: {err}");
    }

    tokens.cache.insert(CachedToken {
        token: raw.to_string(),
        calendar_id: validated.calendar_id.clone(),
        permission: validated.permission,
    });

    let cookie = format!(
        "{TOKEN_COOKIE}={}; Path=/; SameSite=Lax",
        tokens.cache.encode()?
    );
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie.parse().map_err(|_| ApiError::Internal)?);

    Ok((
        headers,
        Json(json!({
            "calendar_id": validated.calendar_id,
            "permission": validated.permission,
        })),
    ))
}
