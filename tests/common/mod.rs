//! Fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bc_token_proxy::auth::{AccessToken, TokenProvider};
use bc_token_proxy::cache::TokenStore;
use bc_token_proxy::error::{ProxyError, Result};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Identity provider stand-in that counts acquisitions
pub struct FakeProvider {
    token: Option<String>,
    lifetime_secs: Option<i64>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn issuing(token: &str, lifetime_secs: Option<i64>) -> Self {
        Self {
            token: Some(token.to_string()),
            lifetime_secs,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            token: None,
            lifetime_secs: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for FakeProvider {
    async fn acquire(&self) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.token {
            Some(token) => Ok(AccessToken {
                access_token: token.clone(),
                expires_at: self
                    .lifetime_secs
                    .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
            }),
            None => Err(ProxyError::Token(
                "Token request failed with status 401 Unauthorized: invalid_client".to_string(),
            )),
        }
    }
}

/// Store whose every operation fails, like an unreachable Redis
#[derive(Default)]
pub struct BrokenStore {
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

#[async_trait]
impl TokenStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(ProxyError::Cache("Redis GET error: connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(ProxyError::Cache("Redis SETEX error: connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(ProxyError::Cache("Redis DEL error: connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Store that records every write, for TTL assertions
#[derive(Default)]
pub struct RecordingStore {
    pub writes: Mutex<Vec<(String, String, Duration)>>,
    pub deletes: Mutex<Vec<String>>,
}

#[async_trait]
impl TokenStore for RecordingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
