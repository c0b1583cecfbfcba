//! iCloud sync endpoints.
//!
//! A calendar is bound to one remote iCloud calendar via a sync link
//! carrying the account credentials. Sync runs pull events for a window
//! around today and replace the calendar's imported events wholesale.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use shiftcal_core::{ChangeKind, ExternalEvent, Permission, SyncStatus};
use shiftcal_provider_icloud::{Credentials, discover, fetch_events, list_calendars};
use tracing::{info, warn};

use super::require;
use crate::error::ApiError;
use crate::identity::{Identity, TokenCookie};
use crate::state::AppState;
use crate::store::SyncLink;

/// Default sync window around today.
const SYNC_PAST_DAYS: i64 = 30;
const SYNC_FUTURE_DAYS: i64 = 90;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendars/{id}/sync", post(run_sync))
        .route("/calendars/{id}/sync/discover", post(discover_calendars))
        .route(
            "/calendars/{id}/sync/link",
            put(put_link).get(show_link).delete(delete_link),
        )
        .route("/calendars/{id}/sync/log", get(log))
        .route("/calendars/{id}/sync/events", get(events))
}

#[derive(Deserialize)]
struct DiscoverBody {
    apple_id: String,
    app_password: String,
}

/// Validate credentials and list the account's remote calendars.
async fn discover_calendars(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Json(body): Json<DiscoverBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;

    let credentials = Credentials::new(body.apple_id, body.app_password);
    let account = discover(&credentials)
        .await
        .map_err(|err| ApiError::Upstream(format!("{err:#}")))?;
    let calendars = list_calendars(&credentials, &account.calendar_home_url)
        .await
        .map_err(|err| ApiError::Upstream(format!("{err:#}")))?;

    Ok(Json(json!({ "calendars": calendars })))
}

#[derive(Deserialize)]
struct LinkBody {
    apple_id: String,
    app_password: String,
    remote_url: String,
    remote_name: String,
}

async fn put_link(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Json(body): Json<LinkBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    let link = SyncLink {
        calendar_id: id.clone(),
        apple_id: body.apple_id,
        app_password: body.app_password,
        remote_url: body.remote_url,
        remote_name: body.remote_name,
        created_at: Utc::now(),
    };
    state.store.put_sync_link(&link)?;
    state.audit(identity.user_id(), "sync.link", Some(&id), Some(&link.remote_name));
    Ok(Json(json!({ "link": link })))
}

async fn show_link(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    let link = state.store.sync_link(&id)?;
    Ok(Json(json!({ "link": link })))
}

async fn delete_link(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Admin)?;
    if !state.store.delete_sync_link(&id)? {
        return Err(ApiError::NotFound);
    }
    state.audit(identity.user_id(), "sync.unlink", Some(&id), None);
    state.publish(&id, ChangeKind::SyncLog);
    Ok(Json(json!({ "ok": true })))
}

/// Pull remote events and replace the calendar's imported set. Failures
/// are recorded in the sync log and surfaced as 502.
async fn run_sync(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Write)?;

    let Some(link) = state.store.sync_link(&id)? else {
        return Err(ApiError::BadRequest(
            "Calendar is not linked to an external calendar".to_string(),
        ));
    };

    let now = Utc::now();
    let from = now - Duration::days(SYNC_PAST_DAYS);
    let to = now + Duration::days(SYNC_FUTURE_DAYS);
    let credentials = Credentials::new(link.apple_id.clone(), link.app_password.clone());

    let remote = match fetch_events(&credentials, &link.remote_url, from, to).await {
        Ok(remote) => remote,
        Err(err) => {
            warn!("sync failed for calendar {id}: {err:#}");
            let message = format!("{err:#}");
            if let Err(log_err) = state.store.record_sync(&id, SyncStatus::Error, Some(&message), 0)
            {
                warn!("failed to record sync error: {log_err}");
            }
            state.publish(&id, ChangeKind::SyncLog);
            return Err(ApiError::Upstream(message));
        }
    };

    let events: Vec<ExternalEvent> = remote
        .into_iter()
        .map(|e| ExternalEvent {
            uid: e.uid,
            calendar_id: id.clone(),
            summary: e.summary,
            starts_at: e.starts_at,
            ends_at: e.ends_at,
            all_day: e.all_day,
            location: e.location,
            description: e.description,
            fetched_at: now,
        })
        .collect();

    let imported = events.len() as i64;
    state.store.replace_external_events(&id, &events)?;
    let entry = state.store.record_sync(&id, SyncStatus::Ok, None, imported)?;
    state.publish(&id, ChangeKind::SyncLog);
    state.publish(&id, ChangeKind::Calendar);
    info!("synced {imported} events into calendar {id} from {}", link.remote_name);

    Ok(Json(json!({ "sync": entry })))
}

async fn log(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Read)?;
    let entries = state.store.sync_log_for_calendar(&id, 50)?;
    Ok(Json(json!({ "log": entries })))
}

#[derive(Deserialize)]
struct EventRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

async fn events(
    State(state): State<AppState>,
    identity: Identity,
    tokens: TokenCookie,
    Path(id): Path<String>,
    Query(range): Query<EventRange>,
) -> Result<impl IntoResponse, ApiError> {
    require(&state, &identity, &tokens.context(), &id, Permission::Read)?;
    let events = state.store.external_events_in_range(&id, range.from, range.to)?;
    Ok(Json(json!({ "events": events })))
}
