//! Redis-backed token store

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tokio::sync::RwLock;

use super::TokenStore;
use crate::error::{ProxyError, Result};

/// Shared token store for deployments running several proxy instances
pub struct RedisStore {
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisStore {
    /// Open a managed connection; it reconnects on its own after transient failures
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| ProxyError::Cache(format!("Invalid Redis URL: {}", e)))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| ProxyError::Cache(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!("Connected to Redis");

        Ok(Self {
            conn: RwLock::new(Some(conn)),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or_else(|| ProxyError::Cache("Redis connection is closed".to_string()))
    }
}

#[async_trait]
impl TokenStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| ProxyError::Cache(format!("Redis GET error: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(|e| ProxyError::Cache(format!("Redis SETEX error: {}", e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| ProxyError::Cache(format!("Redis DEL error: {}", e)))
    }

    async fn close(&self) -> Result<()> {
        if self.conn.write().await.take().is_some() {
            tracing::info!("Redis connection closed");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
