//! HTTP middleware for bearer token injection and 401 handling
//!
//! Implements `reqwest-middleware::Middleware` to attach the cached upstream
//! token to every relayed request. A 401 from upstream clears the cached
//! token; the request itself is retried only when explicitly enabled.

use crate::auth::TokenCacheManager;
use async_trait::async_trait;
use http::Extensions;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next, Result as MiddlewareResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Middleware that injects bearer tokens and invalidates them on 401
pub struct AuthMiddleware {
    tokens: Arc<TokenCacheManager>,
    retry_on_unauthorized: bool,
}

impl AuthMiddleware {
    pub fn new(tokens: Arc<TokenCacheManager>, retry_on_unauthorized: bool) -> Self {
        Self {
            tokens,
            retry_on_unauthorized,
        }
    }

    async fn authorize(&self, req: &mut Request) -> MiddlewareResult<()> {
        let token = self
            .tokens
            .get_token()
            .await
            .map_err(|e| reqwest_middleware::Error::Middleware(e.into()))?;

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("Invalid token: {}", e))
        })?;
        value.set_sensitive(true);
        req.headers_mut().insert(AUTHORIZATION, value);

        debug!("Injected Authorization header with bearer token");
        Ok(())
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> MiddlewareResult<Response> {
        self.authorize(&mut req).await?;

        // Streaming bodies cannot be replayed; those requests never retry
        let retry = if self.retry_on_unauthorized {
            req.try_clone()
        } else {
            None
        };

        let response = next.clone().run(req, extensions).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("Upstream returned 401 Unauthorized, clearing cached token");
        self.tokens.invalidate().await;

        let Some(mut retry) = retry else {
            return Ok(response);
        };

        self.authorize(&mut retry).await?;
        debug!("Retrying request once with a fresh token");
        next.run(retry, extensions).await
    }
}
