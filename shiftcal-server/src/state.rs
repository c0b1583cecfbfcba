//! Shared application state.

use chrono::Duration;
use shiftcal_core::{ChangeKind, Resolver};
use tracing::warn;

use crate::config::ServerConfig;
use crate::events::EventBus;
use crate::store::SqliteStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub resolver: Resolver,
    pub events: EventBus,
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(store: SqliteStore, config: &ServerConfig) -> Self {
        AppState {
            store,
            resolver: Resolver::new(config.access_policy()),
            events: EventBus::new(),
            session_ttl: Duration::hours(config.session_ttl_hours),
        }
    }

    /// Record an audit row. Best-effort: a failed audit write never fails
    /// the audited operation.
    pub fn audit(&self, actor_id: Option<&str>, action: &str, target: Option<&str>, detail: Option<&str>) {
        if let Err(err) = self.store.record_audit(actor_id, action, target, detail) {
            warn!("audit write failed for {action}: {err}");
        }
    }

    pub fn publish(&self, calendar_id: &str, kind: ChangeKind) {
        self.events.publish(calendar_id, kind);
    }
}
