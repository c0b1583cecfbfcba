//! Error types for the shiftcal ecosystem.

use thiserror::Error;

/// Errors that can occur in shiftcal core operations.
///
/// The HTTP layer maps these onto statuses: `Unauthorized` -> 401,
/// `Forbidden`/`Banned` -> 403, the `*NotFound` variants -> 404,
/// `InvalidOperation`/`NotPublic` -> 400, `Store` -> 500.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permission")]
    Forbidden,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Calendar is not public")]
    NotPublic,

    #[error("Account is banned")]
    Banned,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Token cache error: {0}")]
    TokenCache(String),
}

/// Result type alias for shiftcal core operations.
pub type Result<T> = std::result::Result<T, Error>;
