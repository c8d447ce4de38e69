//! Error types for the Business Central proxy

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};
use thiserror::Error;

/// Message placed in the `error` field of every failure envelope
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Failed to fetch from Business Central";

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Origin {0} is not allowed by CORS")]
    OriginNotAllowed(String),

    #[error("Upstream responded with {status}")]
    Upstream { status: StatusCode, details: Value },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl ProxyError {
    /// Status code reported to the caller
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::OriginNotAllowed(_) => StatusCode::FORBIDDEN,
            ProxyError::Http(e) => e
                .status()
                .and_then(|s| StatusCode::from_u16(s.as_u16()).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value placed in the `details` field of the error envelope
    pub fn details(&self) -> Value {
        match self {
            ProxyError::Upstream { details, .. } => details.clone(),
            ProxyError::OriginNotAllowed(_) => Value::String("Not allowed by CORS".to_string()),
            // Surface the token failure itself rather than the middleware wrapper
            ProxyError::Middleware(e) => Value::String(e.to_string()),
            other => Value::String(other.to_string()),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": UPSTREAM_FAILURE_MESSAGE,
            "details": self.details(),
        });
        (self.status(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
