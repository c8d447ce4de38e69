//! Access token model
//!
//! Handles the token response from the identity provider and the JSON form
//! stored in the token cache.

use crate::error::{ProxyError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Cache lifetime used when the identity provider does not report an expiry (55 minutes)
pub const FALLBACK_TTL_SECS: u64 = 3300;

/// Bearer token for the upstream API
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

// Keep the credential out of logs and panics
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token response from the identity provider's token endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Anchor the relative `expires_in` to `now`
    pub fn into_access_token(self, now: DateTime<Utc>) -> AccessToken {
        let expires_at = self
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime));

        AccessToken {
            access_token: self.access_token,
            expires_at,
        }
    }
}

impl AccessToken {
    /// Seconds the cache entry for this token should live
    ///
    /// Never negative. Falls back to [`FALLBACK_TTL_SECS`] when the expiry is unknown.
    pub fn cache_ttl(&self, now: DateTime<Utc>) -> std::time::Duration {
        let secs = match self.expires_at {
            Some(expires_at) => u64::try_from((expires_at - now).num_seconds()).unwrap_or(0),
            None => FALLBACK_TTL_SECS,
        };
        std::time::Duration::from_secs(secs)
    }

    /// Serialize to the cache entry format
    pub fn to_cache_value(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a cache entry
    pub fn from_cache_value(value: &str) -> Result<Self> {
        let token: AccessToken = serde_json::from_str(value)?;
        if token.access_token.is_empty() {
            return Err(ProxyError::Cache("Cached token is empty".to_string()));
        }
        Ok(token)
    }
}
