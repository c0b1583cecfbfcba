//! End-to-end API tests over the real router and a temp-file database.

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use shiftcal_core::{Permission, Role, Store};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::app;
use crate::config::ServerConfig;
use crate::state::AppState;
use crate::store::SqliteStore;

fn server(allow_guest_access: bool) -> (TempDir, AppState, Router) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
    let config = ServerConfig {
        allow_guest_access,
        ..ServerConfig::default()
    };
    let state = AppState::new(store, &config);
    let router = app(state.clone());
    (dir, state, router)
}

struct TestRequest {
    method: Method,
    uri: String,
    session: Option<String>,
    cookie: Option<String>,
    body: Option<Value>,
}

impl TestRequest {
    fn new(method: Method, uri: &str) -> Self {
        TestRequest {
            method,
            uri: uri.to_string(),
            session: None,
            cookie: None,
            body: None,
        }
    }

    fn session(mut self, session: &str) -> Self {
        self.session = Some(session.to_string());
        self
    }

    fn cookie(mut self, cookie: &str) -> Self {
        self.cookie = Some(cookie.to_string());
        self
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    async fn send(self, router: &Router) -> (StatusCode, Value, Option<String>) {
        let mut builder = Request::builder().method(self.method).uri(&self.uri);
        if let Some(session) = &self.session {
            builder = builder.header(AUTHORIZATION, format!("Bearer {session}"));
        }
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie.clone());
        }
        let request = match self.body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value, set_cookie)
    }
}

async fn register(router: &Router, username: &str) -> (String, String) {
    let (status, body, _) = TestRequest::new(Method::POST, "/auth/register")
        .json(json!({ "username": username, "password": "correct-horse" }))
        .send(router)
        .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["session"].as_str().unwrap().to_string(),
    )
}

async fn create_calendar(router: &Router, session: &str, name: &str) -> String {
    let (status, body, _) = TestRequest::new(Method::POST, "/calendars")
        .session(session)
        .json(json!({ "name": name }))
        .send(router)
        .await;
    assert_eq!(status, StatusCode::OK);
    body["calendar"]["id"].as_str().unwrap().to_string()
}

// ==================== Auth ====================

#[tokio::test]
async fn login_round_trip() {
    let (_dir, _state, router) = server(false);
    register(&router, "alice").await;

    let (status, body, set_cookie) = TestRequest::new(Method::POST, "/auth/login")
        .json(json!({ "username": "alice", "password": "correct-horse" }))
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(set_cookie.unwrap().starts_with("shiftcal_session="));

    let session = body["session"].as_str().unwrap();
    let (status, body, _) = TestRequest::new(Method::GET, "/auth/me")
        .session(session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (_dir, _state, router) = server(false);
    register(&router, "alice").await;

    let (status, body, _) = TestRequest::new(Method::POST, "/auth/login")
        .json(json!({ "username": "alice", "password": "nope" }))
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn banning_ends_sessions_and_blocks_login() {
    let (_dir, state, router) = server(false);
    let (user_id, session) = register(&router, "alice").await;

    state.store.set_ban(&user_id, Some("spam"), None).unwrap();

    // The session died with the ban, so the caller is anonymous again.
    let (status, _, _) = TestRequest::new(Method::GET, "/auth/me")
        .session(&session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = TestRequest::new(Method::POST, "/auth/login")
        .json(json!({ "username": "alice", "password": "correct-horse" }))
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ==================== Permission gating ====================

#[tokio::test]
async fn anonymous_cannot_create_calendars() {
    let (_dir, _state, router) = server(false);
    let (status, _, _) = TestRequest::new(Method::POST, "/calendars")
        .json(json!({ "name": "Ward A" }))
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn read_share_cannot_write() {
    let (_dir, _state, router) = server(false);
    let (_owner_id, owner_session) = register(&router, "owner").await;
    let (member_id, member_session) = register(&router, "member").await;
    let calendar_id = create_calendar(&router, &owner_session, "Ward A").await;

    let (status, _, _) = TestRequest::new(
        Method::PUT,
        &format!("/calendars/{calendar_id}/shares/{member_id}"),
    )
    .session(&owner_session)
    .json(json!({ "permission": "read" }))
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = TestRequest::new(
        Method::GET,
        &format!("/calendars/{calendar_id}/shifts?from=2026-03-01&to=2026-03-31"),
    )
    .session(&member_session)
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shifts"], json!([]));

    // Visible but insufficient answers 403.
    let (status, _, _) = TestRequest::new(
        Method::POST,
        &format!("/calendars/{calendar_id}/shifts"),
    )
    .session(&member_session)
    .json(json!({ "date": "2026-03-05", "title": "Early" }))
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inaccessible_calendar_answers_not_found() {
    let (_dir, _state, router) = server(false);
    let (_owner_id, owner_session) = register(&router, "owner").await;
    let (_outsider_id, outsider_session) = register(&router, "outsider").await;
    let calendar_id = create_calendar(&router, &owner_session, "Ward A").await;

    for uri in [
        format!("/calendars/{calendar_id}"),
        format!("/calendars/{calendar_id}/shifts?from=2026-03-01&to=2026-03-31"),
        "/calendars/no-such-calendar".to_string(),
    ] {
        let (status, _, _) = TestRequest::new(Method::GET, &uri)
            .session(&outsider_session)
            .send(&router)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "GET {uri}");
    }
}

#[tokio::test]
async fn owner_writes_and_sees_changes() {
    let (_dir, _state, router) = server(false);
    let (_owner_id, session) = register(&router, "owner").await;
    let calendar_id = create_calendar(&router, &session, "Ward A").await;

    let (status, body, _) = TestRequest::new(
        Method::POST,
        &format!("/calendars/{calendar_id}/shifts"),
    )
    .session(&session)
    .json(json!({
        "date": "2026-03-05",
        "start_time": "08:00:00",
        "end_time": "16:00:00",
        "title": "Early"
    }))
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::OK);
    let shift_id = body["shift"]["id"].as_str().unwrap().to_string();

    let (status, body, _) = TestRequest::new(
        Method::PUT,
        &format!("/calendars/{calendar_id}/shifts/{shift_id}"),
    )
    .session(&session)
    .json(json!({ "date": "2026-03-06", "title": "Late" }))
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shift"]["title"], "Late");

    let (status, body, _) = TestRequest::new(
        Method::GET,
        &format!("/calendars/{calendar_id}/shifts?from=2026-03-01&to=2026-03-31"),
    )
    .session(&session)
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shifts"].as_array().unwrap().len(), 1);
}

// ==================== Guest access ====================

#[tokio::test]
async fn guest_toggle_controls_anonymous_access() {
    for (allow, expected) in [(true, StatusCode::OK), (false, StatusCode::NOT_FOUND)] {
        let (_dir, state, router) = server(allow);
        let (_owner_id, session) = register(&router, "owner").await;
        let calendar_id = create_calendar(&router, &session, "Public board").await;
        state
            .store
            .set_guest_permission(&calendar_id, shiftcal_core::GuestPermission::Read)
            .unwrap();

        let (status, _, _) = TestRequest::new(Method::GET, &format!("/calendars/{calendar_id}"))
            .send(&router)
            .await;
        assert_eq!(status, expected, "allow_guest_access={allow}");
    }
}

// ==================== Tokens ====================

#[tokio::test]
async fn token_redeem_grants_cookie_access() {
    let (_dir, state, router) = server(false);
    let (_owner_id, session) = register(&router, "owner").await;
    let calendar_id = create_calendar(&router, &session, "Ward A").await;
    let token = state
        .store
        .create_token(&calendar_id, Permission::Read, None)
        .unwrap();

    let (status, body, set_cookie) = TestRequest::new(Method::POST, "/tokens/redeem")
        .json(json!({ "token": token.token }))
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["calendar_id"], calendar_id);
    assert_eq!(body["permission"], "read");

    let cookie = set_cookie.unwrap();
    let token_cookie = cookie.split(';').next().unwrap().to_string();
    let (status, _, _) = TestRequest::new(
        Method::GET,
        &format!("/calendars/{calendar_id}/shifts?from=2026-03-01&to=2026-03-31"),
    )
    .cookie(&token_cookie)
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::OK);

    // A read token cannot write.
    let (status, _, _) = TestRequest::new(
        Method::POST,
        &format!("/calendars/{calendar_id}/shifts"),
    )
    .cookie(&token_cookie)
    .json(json!({ "date": "2026-03-05", "title": "Early" }))
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_token_redeems_to_not_found() {
    let (_dir, _state, router) = server(false);
    let (status, _, _) = TestRequest::new(Method::POST, "/tokens/redeem")
        .json(json!({ "token": "no-such-token" }))
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ==================== Subscriptions ====================

#[tokio::test]
async fn dismiss_hides_shared_calendar() {
    let (_dir, _state, router) = server(false);
    let (_owner_id, owner_session) = register(&router, "owner").await;
    let (member_id, member_session) = register(&router, "member").await;
    let calendar_id = create_calendar(&router, &owner_session, "Ward A").await;

    TestRequest::new(
        Method::PUT,
        &format!("/calendars/{calendar_id}/shares/{member_id}"),
    )
    .session(&owner_session)
    .json(json!({ "permission": "write" }))
    .send(&router)
    .await;

    let (status, _, _) = TestRequest::new(Method::POST, &format!("/calendars/{calendar_id}/dismiss"))
        .session(&member_session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body, _) = TestRequest::new(Method::GET, "/calendars")
        .session(&member_session)
        .send(&router)
        .await;
    assert_eq!(body["calendars"], json!([]));

    // Dismissal hides without revoking: direct access still works.
    let (status, _, _) = TestRequest::new(Method::GET, &format!("/calendars/{calendar_id}"))
        .session(&member_session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn transfer_clears_new_owners_dismissal() {
    let (_dir, state, router) = server(false);
    let (_owner_id, owner_session) = register(&router, "owner").await;
    let (heir_id, heir_session) = register(&router, "heir").await;
    let calendar_id = create_calendar(&router, &owner_session, "Public board").await;
    state
        .store
        .set_guest_permission(&calendar_id, shiftcal_core::GuestPermission::Read)
        .unwrap();

    // The future owner subscribes to the public calendar, then hides it.
    for op in ["subscribe", "dismiss"] {
        let (status, _, _) =
            TestRequest::new(Method::POST, &format!("/calendars/{calendar_id}/{op}"))
                .session(&heir_session)
                .send(&router)
                .await;
        assert_eq!(status, StatusCode::OK, "{op}");
    }

    let (status, _, _) =
        TestRequest::new(Method::POST, &format!("/calendars/{calendar_id}/transfer"))
            .session(&owner_session)
            .json(json!({ "owner_id": heir_id }))
            .send(&router)
            .await;
    assert_eq!(status, StatusCode::OK);

    // Ownership supersedes the old dismissal.
    let (_, body, _) = TestRequest::new(Method::GET, "/calendars")
        .session(&heir_session)
        .send(&router)
        .await;
    let calendars = body["calendars"].as_array().unwrap();
    assert_eq!(calendars.len(), 1);
    assert_eq!(calendars[0]["calendar"]["id"], calendar_id);
    assert_eq!(calendars[0]["permission"], "owner");
    assert!(
        state
            .store
            .subscription(&heir_id, &calendar_id)
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn dismissing_own_calendar_is_rejected() {
    let (_dir, _state, router) = server(false);
    let (_owner_id, session) = register(&router, "owner").await;
    let calendar_id = create_calendar(&router, &session, "Ward A").await;

    let (status, body, _) =
        TestRequest::new(Method::POST, &format!("/calendars/{calendar_id}/dismiss"))
            .session(&session)
            .send(&router)
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// ==================== Admin ====================

#[tokio::test]
async fn admin_routes_enforce_roles() {
    let (_dir, state, router) = server(false);
    let (_user_id, user_session) = register(&router, "plain").await;
    let (admin_id, admin_session) = register(&router, "boss").await;
    state.store.set_role(&admin_id, Role::SuperAdmin).unwrap();

    let (status, _, _) = TestRequest::new(Method::GET, "/admin/users")
        .session(&user_session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body, _) = TestRequest::new(Method::GET, "/admin/users")
        .session(&admin_session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn orphaned_calendar_is_admin_only_until_assigned() {
    let (_dir, state, router) = server(false);
    let (owner_id, owner_session) = register(&router, "owner").await;
    let (heir_id, heir_session) = register(&router, "heir").await;
    let (admin_id, admin_session) = register(&router, "boss").await;
    state.store.set_role(&admin_id, Role::SuperAdmin).unwrap();
    let calendar_id = create_calendar(&router, &owner_session, "Ward A").await;

    let (status, _, _) = TestRequest::new(Method::DELETE, &format!("/admin/users/{owner_id}"))
        .session(&admin_session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::OK);

    // Orphaned: invisible to everyone outside the admin surface.
    let (status, _, _) = TestRequest::new(Method::GET, &format!("/calendars/{calendar_id}"))
        .session(&heir_session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = TestRequest::new(
        Method::POST,
        &format!("/admin/calendars/{calendar_id}/assign"),
    )
    .session(&admin_session)
    .json(json!({ "owner_id": heir_id }))
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = TestRequest::new(Method::GET, &format!("/calendars/{calendar_id}"))
        .session(&heir_session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permission"], "owner");

    // Assign only applies to orphans.
    let (status, _, _) = TestRequest::new(
        Method::POST,
        &format!("/admin/calendars/{calendar_id}/assign"),
    )
    .session(&admin_session)
    .json(json!({ "owner_id": admin_id }))
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mutations_publish_change_events() {
    use futures::StreamExt;
    use shiftcal_core::ChangeKind;

    let (_dir, state, router) = server(false);
    let (_owner_id, session) = register(&router, "owner").await;
    let calendar_id = create_calendar(&router, &session, "Ward A").await;

    let mut changes = Box::pin(state.events.subscribe(calendar_id.clone()));

    let (status, _, _) = TestRequest::new(
        Method::POST,
        &format!("/calendars/{calendar_id}/shifts"),
    )
    .session(&session)
    .json(json!({ "date": "2026-03-05", "title": "Early" }))
    .send(&router)
    .await;
    assert_eq!(status, StatusCode::OK);

    let event = changes.next().await.unwrap();
    assert_eq!(event.calendar_id, calendar_id);
    assert_eq!(event.kind, ChangeKind::Shift);
}

#[tokio::test]
async fn sync_requires_link() {
    let (_dir, _state, router) = server(false);
    let (_owner_id, session) = register(&router, "owner").await;
    let calendar_id = create_calendar(&router, &session, "Ward A").await;

    let (status, body, _) = TestRequest::new(Method::POST, &format!("/calendars/{calendar_id}/sync"))
        .session(&session)
        .send(&router)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not linked"));
}
