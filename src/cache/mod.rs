//! Key-value stores backing the token cache
//!
//! The token cache manager only needs `get`/`set`/`delete` with a TTL, so
//! both the Redis backend and the in-process map sit behind [`TokenStore`].

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Release the backend connection. Later calls may fail.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Backend name for log lines
    fn name(&self) -> &'static str;
}
