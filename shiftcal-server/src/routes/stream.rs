//! Live updates over SSE.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::get;
use axum::Router;
use futures::stream::{Stream, StreamExt};
use shiftcal_core::Permission;

use super::require;
use crate::error::ApiError;
use crate::identity::{Identity, TokenCookie};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/calendars/{id}/events/stream", get(stream))
}

/// Change feed for one calendar. Access is checked once at subscription;
/// events carry only the change kind, so a revoked caller learns nothing
/// beyond "something changed" until the stream is re-opened.
async fn stream(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Read)?;

    let events = state.events.subscribe(id).map(|change| {
        let event = Event::default().event("change");
        Ok(match event.json_data(&change) {
            Ok(event) => event,
            Err(_) => Event::default().event("change").data(change.kind.as_str()),
        })
    });

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}
