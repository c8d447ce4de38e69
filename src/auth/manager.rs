//! Token cache manager
//!
//! Get-or-refresh access to the upstream bearer token. The optional store is
//! an optimization only: every store failure degrades to direct acquisition.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{AccessToken, TokenProvider};
use crate::cache::TokenStore;
use crate::error::Result;

/// Fixed key of the cached token entry
pub const TOKEN_CACHE_KEY: &str = "bc_access_token";

pub struct TokenCacheManager {
    provider: Arc<dyn TokenProvider>,
    store: Option<Arc<dyn TokenStore>>,
}

impl TokenCacheManager {
    pub fn new(provider: Arc<dyn TokenProvider>, store: Option<Arc<dyn TokenStore>>) -> Self {
        Self { provider, store }
    }

    pub fn cache_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Get a bearer token (cached or newly acquired)
    ///
    /// A cache hit is trusted as-is; the entry's TTL decides validity.
    pub async fn get_token(&self) -> Result<String> {
        if let Some(token) = self.read_cached().await {
            return Ok(token.access_token);
        }

        info!("Acquiring new token from identity provider");
        let token = match self.provider.acquire().await {
            Ok(token) => token,
            Err(e) => {
                error!("Failed to acquire token: {}", e);
                return Err(e);
            }
        };
        info!("Successfully acquired new token");

        self.write_cached(&token).await;
        Ok(token.access_token)
    }

    /// Drop the cached token so the next call re-acquires
    pub async fn invalidate(&self) {
        let Some(store) = &self.store else {
            return;
        };

        match store.delete(TOKEN_CACHE_KEY).await {
            Ok(()) => info!("Cleared cached token after upstream rejected it"),
            Err(e) => warn!("Failed to clear cached token from {}: {}", store.name(), e),
        }
    }

    /// Close the backing store, if any
    pub async fn close(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.close().await {
                warn!("Failed to close {} token cache: {}", store.name(), e);
            }
        }
    }

    async fn read_cached(&self) -> Option<AccessToken> {
        let store = match &self.store {
            Some(store) => store,
            None => {
                debug!("Token cache disabled");
                return None;
            }
        };

        match store.get(TOKEN_CACHE_KEY).await {
            Ok(Some(value)) => match AccessToken::from_cache_value(&value) {
                Ok(token) => {
                    info!("Retrieved token from {} cache", store.name());
                    Some(token)
                }
                Err(e) => {
                    warn!("Ignoring unreadable cached token: {}", e);
                    None
                }
            },
            Ok(None) => {
                debug!("Token cache miss");
                None
            }
            Err(e) => {
                warn!("Token cache read error: {}", e);
                None
            }
        }
    }

    async fn write_cached(&self, token: &AccessToken) {
        let Some(store) = &self.store else {
            return;
        };

        let ttl = token.cache_ttl(Utc::now());
        if ttl.is_zero() {
            warn!("Acquired token is already expired, not caching it");
            return;
        }

        let value = match token.to_cache_value() {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize token for caching: {}", e);
                return;
            }
        };

        match store.set(TOKEN_CACHE_KEY, &value, ttl).await {
            Ok(()) => info!(
                "Token cached in {} (expires in {} minutes)",
                store.name(),
                ttl.as_secs() / 60
            ),
            Err(e) => warn!("Failed to cache token: {}", e),
        }
    }
}
