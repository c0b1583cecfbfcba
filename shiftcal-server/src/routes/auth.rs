//! Registration, login, and session management.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::identity::{Identity, SESSION_COOKIE};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[derive(Deserialize)]
struct CredentialsBody {
    username: String,
    password: String,
}

fn auth_disabled(state: &AppState) -> Result<(), ApiError> {
    if state.resolver.policy().auth_enabled {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Accounts are disabled on this server".to_string(),
        ))
    }
}

fn session_cookie(session_id: &str) -> String {
    format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax")
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<impl IntoResponse, ApiError> {
    auth_disabled(&state)?;
    let username = body.username.trim();
    if username.is_empty() || body.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Username must be non-empty and password at least 8 characters".to_string(),
        ));
    }

    let user = state.store.create_user(username, &body.password)?;
    state.audit(Some(&user.id), "user.create", Some(&user.id), None);
    info!("registered user {}", user.username);

    let session = state.store.create_session(&user.id, state.session_ttl)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, session_cookie(&session).parse().map_err(|_| ApiError::Internal)?);
    Ok((headers, Json(json!({ "user": user, "session": session }))))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<impl IntoResponse, ApiError> {
    auth_disabled(&state)?;

    let Some(user) = state.store.verify_password(&body.username, &body.password)? else {
        return Err(ApiError::Unauthorized);
    };
    if user.ban_active(Utc::now()) {
        return Err(ApiError::Forbidden);
    }

    let session = state.store.create_session(&user.id, state.session_ttl)?;
    state.audit(Some(&user.id), "login", None, None);

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, session_cookie(&session).parse().map_err(|_| ApiError::Internal)?);
    Ok((headers, Json(json!({ "user": user, "session": session }))))
}

async fn logout(
    State(state): State<AppState>,
    identity: Identity,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    // Best effort: drop whichever session the caller presented.
    if identity.0.is_some() {
        if let Some(session_id) = bearer_or_cookie(&headers) {
            state.store.delete_session(&session_id)?;
        }
    }

    let mut out = HeaderMap::new();
    let expired = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    out.insert(SET_COOKIE, expired.parse().map_err(|_| ApiError::Internal)?);
    Ok((out, Json(json!({ "ok": true }))))
}

async fn me(identity: Identity) -> Result<impl IntoResponse, ApiError> {
    let user = identity.require()?;
    Ok(Json(json!({ "user": user })))
}

fn bearer_or_cookie(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Some(token) = value.to_str().ok()?.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == SESSION_COOKIE).then(|| value.to_string())
    })
}
