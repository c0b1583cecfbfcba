//! Access token validation and the client-side token cache.
//!
//! Tokens presented by a client (from its cookie cache) are only a hint:
//! every use re-validates the raw value against the store. Usage recording
//! is a separate best-effort call made by the server after validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::permission::Permission;
use crate::store::Store;

/// A token that passed validation: exists, active, not expired.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedToken {
    pub token_id: String,
    pub calendar_id: String,
    pub permission: Permission,
}

/// Validate an opaque token value at `now`.
///
/// Returns `None` when the token is unknown, deactivated, or expired; the
/// three cases are indistinguishable to the caller.
pub fn validate_token(
    store: &dyn Store,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Option<ValidatedToken>> {
    let Some(token) = store.token_by_value(raw)? else {
        return Ok(None);
    };

    if !token.is_valid(now) {
        return Ok(None);
    }

    Ok(Some(ValidatedToken {
        token_id: token.id,
        calendar_id: token.calendar_id,
        permission: token.permission,
    }))
}

/// Raw token values presented with a request.
#[derive(Debug, Clone, Default)]
pub struct TokenContext {
    tokens: Vec<String>,
}

impl TokenContext {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// First presented token that validates and is bound to `calendar_id`.
    pub fn validate_for(
        &self,
        store: &dyn Store,
        calendar_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ValidatedToken>> {
        for raw in self.iter() {
            if let Some(validated) = validate_token(store, raw, now)? {
                if validated.calendar_id == calendar_id {
                    return Ok(Some(validated));
                }
            }
        }
        Ok(None)
    }
}

/// One entry of the client-side token cache cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    pub token: String,
    pub calendar_id: String,
    pub permission: Permission,
}

/// Hard cap on cached tokens so the cookie stays well below browser limits.
const MAX_CACHED_TOKENS: usize = 16;

/// The token list a client carries in its cookie.
///
/// Serialized as URL-encoded JSON so it survives round-trips through a
/// standard HTTP cookie header. Oldest entries are dropped past the cap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenCache {
    entries: Vec<CachedToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CachedToken] {
        &self.entries
    }

    /// Add a token, replacing any existing entry with the same value and
    /// evicting the oldest entry when full.
    pub fn insert(&mut self, entry: CachedToken) {
        self.entries.retain(|e| e.token != entry.token);
        self.entries.push(entry);
        while self.entries.len() > MAX_CACHED_TOKENS {
            self.entries.remove(0);
        }
    }

    pub fn remove(&mut self, token: &str) {
        self.entries.retain(|e| e.token != token);
    }

    pub fn context(&self) -> TokenContext {
        TokenContext::new(self.entries.iter().map(|e| e.token.clone()).collect())
    }

    /// Encode for use as a cookie value.
    pub fn encode(&self) -> Result<String> {
        let json =
            serde_json::to_string(&self.entries).map_err(|e| Error::TokenCache(e.to_string()))?;
        Ok(urlencoding::encode(&json).into_owned())
    }

    /// Decode a cookie value produced by [`TokenCache::encode`].
    pub fn decode(value: &str) -> Result<Self> {
        let json = urlencoding::decode(value).map_err(|e| Error::TokenCache(e.to_string()))?;
        let entries: Vec<CachedToken> =
            serde_json::from_str(&json).map_err(|e| Error::TokenCache(e.to_string()))?;
        Ok(Self { entries })
    }
}
