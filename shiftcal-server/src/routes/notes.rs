//! Day note endpoints. One note per (calendar, day); writing an empty
//! text removes the note.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use shiftcal_core::{ChangeKind, Permission};

use super::{DateRange, require};
use crate::error::ApiError;
use crate::identity::{Identity, TokenCookie};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendars/{id}/notes", get(list))
        .route("/calendars/{id}/notes/{date}", put(put_note))
}

async fn list(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Query(range): Query<DateRange>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Read)?;
    let notes = state.store.notes_in_range(&id, range.from, range.to)?;
    Ok(Json(json!({ "notes": notes })))
}

#[derive(Deserialize)]
struct NoteBody {
    text: String,
}

async fn put_note(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path((id, day)): Path<(String, NaiveDate)>,
    Json(body): Json<NoteBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Write)?;
    let note = state.store.put_note(&id, day, &body.text)?;
    state.publish(&id, ChangeKind::Note);
    Ok(Json(json!({ "note": note })))
}
