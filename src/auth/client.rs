//! Client-credential token acquisition
//!
//! Authenticates the proxy itself (no user involved) against the Azure AD v2
//! token endpoint and returns a bearer token for the Business Central API.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

use super::{AccessToken, TokenResponse};
use crate::error::{ProxyError, Result};

const TOKEN_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Source of fresh access tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquire a new token from the identity provider
    async fn acquire(&self) -> Result<AccessToken>;
}

/// Error body returned by the token endpoint
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth 2.0 client-credential grant against a single token endpoint
pub struct ClientCredentialsClient {
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    scope: String,
    http: reqwest::Client,
}

impl ClientCredentialsClient {
    pub fn new(
        token_endpoint: String,
        client_id: String,
        client_secret: String,
        scope: String,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(TOKEN_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            token_endpoint,
            client_id,
            client_secret,
            scope,
            http,
        })
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsClient {
    async fn acquire(&self) -> Result<AccessToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProxyError::Token(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(ProxyError::Token(format!(
                "Token request failed with status {}: {}",
                status, reason
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProxyError::Token(format!("Failed to parse token response: {}", e)))?;

        Ok(token_response.into_access_token(Utc::now()))
    }
}
