//! Request identity and token extraction.
//!
//! `Identity` resolves the caller's account from a session (bearer header
//! or cookie); `TokenCookie` carries the raw access tokens the client has
//! cached. Both are lenient: a stale session or a garbled token cookie
//! degrades to anonymous rather than failing the request. The one hard
//! rejection is an actively banned account.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use chrono::Utc;
use shiftcal_core::{TokenCache, TokenContext, User};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "shiftcal_session";
pub const TOKEN_COOKIE: &str = "shiftcal_tokens";

/// The caller's account, if any. `None` is a legitimate anonymous caller.
#[derive(Debug, Clone)]
pub struct Identity(pub Option<User>);

impl Identity {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.id.as_str())
    }

    /// The account, or 401 when the route needs one.
    pub fn require(&self) -> Result<&User, ApiError> {
        self.0.as_ref().ok_or(ApiError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.resolver.policy().auth_enabled {
            return Ok(Identity(None));
        }

        let Some(session_id) = session_id(parts) else {
            return Ok(Identity(None));
        };

        let now = Utc::now();
        match state.store.session_user(&session_id, now)? {
            Some(user) if user.ban_active(now) => Err(ApiError::Forbidden),
            Some(user) => Ok(Identity(Some(user))),
            None => {
                debug!("unknown or expired session presented");
                Ok(Identity(None))
            }
        }
    }
}

fn session_id(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        if let Ok(text) = value.to_str() {
            if let Some(token) = text.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }
    cookie_value(parts, SESSION_COOKIE)
}

/// Access tokens presented via the client's token cache cookie.
#[derive(Debug, Clone, Default)]
pub struct TokenCookie {
    pub cache: TokenCache,
}

impl TokenCookie {
    pub fn context(&self) -> TokenContext {
        self.cache.context()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for TokenCookie {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let cache = match cookie_value(parts, TOKEN_COOKIE) {
            Some(value) => TokenCache::decode(&value).unwrap_or_else(|err| {
                debug!("discarding unparseable token cookie: {err}");
                TokenCache::new()
            }),
            None => TokenCache::new(),
        };
        Ok(TokenCookie { cache })
    }
}

fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    for header in parts.headers.get_all(COOKIE) {
        let Ok(text) = header.to_str() else { continue };
        for pair in text.split(';') {
            let pair = pair.trim();
            if let Some((key, value)) = pair.split_once('=') {
                if key == name {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let request = Request::builder()
            .uri("/")
            .header(COOKIE, cookie)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn finds_named_cookie_among_several() {
        let parts = parts_with_cookie("theme=dark; shiftcal_session=abc123; lang=en");
        assert_eq!(
            cookie_value(&parts, SESSION_COOKIE).as_deref(),
            Some("abc123")
        );
        assert_eq!(cookie_value(&parts, TOKEN_COOKIE), None);
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let request = Request::builder()
            .uri("/")
            .header(AUTHORIZATION, "Bearer sess-1")
            .header(COOKIE, "shiftcal_session=sess-2")
            .body(())
            .unwrap();
        let parts = request.into_parts().0;
        assert_eq!(session_id(&parts).as_deref(), Some("sess-1"));
    }
}
