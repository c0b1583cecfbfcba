//! Shift endpoints.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use shiftcal_core::{ChangeKind, Permission};

use super::{DateRange, require};
use crate::error::ApiError;
use crate::identity::{Identity, TokenCookie};
use crate::state::AppState;
use crate::store::NewShift;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendars/{id}/shifts", get(list).post(create))
        .route(
            "/calendars/{id}/shifts/{shift_id}",
            axum::routing::put(update).delete(delete_shift),
        )
}

async fn list(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Query(range): Query<DateRange>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Read)?;
    let shifts = state.store.shifts_in_range(&id, range.from, range.to)?;
    Ok(Json(json!({ "shifts": shifts })))
}

#[derive(Deserialize)]
struct ShiftBody {
    date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    title: String,
    preset_id: Option<String>,
    note: Option<String>,
}

impl ShiftBody {
    fn validate(self) -> Result<NewShift, ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::BadRequest("Shift title is required".to_string()));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            // Overnight shifts wrap past midnight, so equal is the only
            // rejected ordering.
            if start == end {
                return Err(ApiError::BadRequest(
                    "Shift start and end must differ".to_string(),
                ));
            }
        }
        Ok(NewShift {
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            title: self.title.trim().to_string(),
            preset_id: self.preset_id,
            note: self.note,
        })
    }
}

async fn create(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Json(body): Json<ShiftBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Write)?;
    let shift = state
        .store
        .create_shift(&id, &body.validate()?, identity.user_id())?;
    state.publish(&id, ChangeKind::Shift);
    Ok(Json(json!({ "shift": shift })))
}

async fn update(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path((id, shift_id)): Path<(String, String)>,
    Json(body): Json<ShiftBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Write)?;
    let shift = state.store.update_shift(&id, &shift_id, &body.validate()?)?;
    state.publish(&id, ChangeKind::Shift);
    Ok(Json(json!({ "shift": shift })))
}

async fn delete_shift(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path((id, shift_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Write)?;
    if !state.store.delete_shift(&id, &shift_id)? {
        return Err(ApiError::NotFound);
    }
    state.publish(&id, ChangeKind::Shift);
    Ok(Json(json!({ "ok": true })))
}
