//! API error responses.
//!
//! Every handler returns `Result<_, ApiError>`; core errors and anyhow
//! errors convert into the right status. Bodies are always `{"error": ...}`
//! JSON. Store failures answer 500 without leaking the underlying message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest(String),
    /// A remote provider failed during sync.
    Upstream(String),
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Authentication required".to_string(),
            ApiError::Forbidden => "Insufficient permission".to_string(),
            ApiError::NotFound => "Not found".to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Upstream(msg) => msg.clone(),
            ApiError::Internal => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<shiftcal_core::Error> for ApiError {
    fn from(err: shiftcal_core::Error) -> Self {
        use shiftcal_core::Error;
        match err {
            Error::Unauthorized => ApiError::Unauthorized,
            Error::Forbidden | Error::Banned => ApiError::Forbidden,
            Error::CalendarNotFound(_) | Error::UserNotFound(_) => ApiError::NotFound,
            Error::InvalidOperation(msg) => ApiError::BadRequest(msg),
            Error::NotPublic => ApiError::BadRequest("Calendar is not public".to_string()),
            Error::Store(msg) => {
                error!("store error: {msg}");
                ApiError::Internal
            }
            Error::TokenCache(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("internal error: {err:#}");
        ApiError::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        use shiftcal_core::Error;

        let cases = [
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
            (Error::Forbidden, StatusCode::FORBIDDEN),
            (Error::Banned, StatusCode::FORBIDDEN),
            (
                Error::CalendarNotFound("c1".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (Error::NotPublic, StatusCode::BAD_REQUEST),
            (
                Error::Store("disk on fire".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn store_message_is_not_leaked() {
        let api = ApiError::from(shiftcal_core::Error::Store("secret path".to_string()));
        assert_eq!(api.message(), "Internal server error");
    }
}
