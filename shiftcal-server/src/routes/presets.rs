//! Shift preset endpoints.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::json;
use shiftcal_core::{ChangeKind, Permission};

use super::require;
use crate::error::ApiError;
use crate::identity::{Identity, TokenCookie};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendars/{id}/presets", get(list).post(create))
        .route(
            "/calendars/{id}/presets/{preset_id}",
            axum::routing::delete(delete_preset),
        )
}

async fn list(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Read)?;
    let presets = state.store.presets_for_calendar(&id)?;
    Ok(Json(json!({ "presets": presets })))
}

#[derive(Deserialize)]
struct PresetBody {
    name: String,
    color: String,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
}

async fn create(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Json(body): Json<PresetBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Write)?;
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Preset name is required".to_string()));
    }
    let preset = state.store.create_preset(
        &id,
        body.name.trim(),
        &body.color,
        body.start_time,
        body.end_time,
    )?;
    state.publish(&id, ChangeKind::Preset);
    Ok(Json(json!({ "preset": preset })))
}

async fn delete_preset(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path((id, preset_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Write)?;
    if !state.store.delete_preset(&id, &preset_id)? {
        return Err(ApiError::NotFound);
    }
    state.publish(&id, ChangeKind::Preset);
    Ok(Json(json!({ "ok": true })))
}
