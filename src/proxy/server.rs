//! Business Central proxy server
//!
//! Accepts any method under the path prefix, attaches the cached bearer token
//! and relays the call to the company-scoped Business Central API.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use super::cors::CorsPolicy;
use super::upstream::{ProxyRequest, UpstreamTarget};
use crate::auth::TokenCacheManager;
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::middleware::AuthMiddleware;

/// Shared state of the proxy handler
pub struct AppState {
    pub http: ClientWithMiddleware,
    pub upstream: UpstreamTarget,
    pub prefix: String,
    pub flatten_success_status: bool,
}

impl AppState {
    /// Create the authenticated upstream client and handler state
    pub fn new(
        tokens: Arc<TokenCacheManager>,
        upstream: UpstreamTarget,
        prefix: String,
        request_timeout: Duration,
        retry_on_unauthorized: bool,
        flatten_success_status: bool,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        let http = ClientBuilder::new(client)
            .with(AuthMiddleware::new(tokens, retry_on_unauthorized))
            .build();

        Ok(Self {
            http,
            upstream,
            prefix,
            flatten_success_status,
        })
    }

    pub fn from_config(config: &Config, tokens: Arc<TokenCacheManager>) -> Result<Self> {
        Self::new(
            tokens,
            config.upstream_target(),
            config.path_prefix.clone(),
            Duration::from_secs(config.request_timeout_secs),
            config.retry_on_unauthorized,
            config.flatten_success_status,
        )
    }
}

/// Build the router: the prefix root plus a catch-all under it
pub fn build_router(state: Arc<AppState>, cors: Option<CorsPolicy>) -> Router {
    // The catch-all never matches an empty tail
    let root = format!("{}/", state.prefix);
    let route = format!("{}/{{*endpoint}}", state.prefix);

    let app = Router::new()
        .route(&root, any(forward))
        .route(&route, any(forward))
        .with_state(state);

    let app = match cors {
        Some(cors) => cors.apply(app),
        None => app,
    };
    app.layer(TraceLayer::new_for_http())
}

/// Serve `app` until `shutdown` resolves
pub async fn run_proxy_server<F>(config: &Config, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Proxy listening on http://{}{}/*", addr, config.path_prefix);
    tracing::info!("Forwarding to {}", config.upstream_target().company_root());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Proxy server stopped");
    Ok(())
}

async fn forward(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let request = ProxyRequest::from_uri(method, &uri, &state.prefix).ok_or_else(|| {
        ProxyError::Upstream {
            status: StatusCode::NOT_FOUND,
            details: Value::String(format!("{} is outside the proxy prefix", uri.path())),
        }
    })?;

    let url = state.upstream.url_for(&request);
    tracing::info!("Calling Business Central: {} {}", request.method, url);

    let mut builder = state
        .http
        .request(request.method.clone(), url.as_str())
        .header(ACCEPT, HeaderValue::from_static("application/json"));

    if request.forwards_body() {
        let content_type = headers
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        builder = builder.header(CONTENT_TYPE, content_type).body(body);
    }

    let response = builder.send().await.map_err(|e| {
        tracing::error!("Error in Business Central proxy: {}", e);
        ProxyError::from(e)
    })?;

    relay(response, state.flatten_success_status).await
}

/// Pass a successful response through, or turn a failed one into the error envelope
async fn relay(response: reqwest::Response, flatten_success_status: bool) -> Result<Response> {
    let status = response.status();
    let content_type = response.headers().get(CONTENT_TYPE).cloned();
    let body = response.bytes().await?;

    if status.is_success() {
        let status = if flatten_success_status {
            StatusCode::OK
        } else {
            status
        };

        let mut relayed = (status, body).into_response();
        relayed.headers_mut().insert(
            CONTENT_TYPE,
            content_type.unwrap_or_else(|| HeaderValue::from_static("application/json")),
        );
        return Ok(relayed);
    }

    let details = serde_json::from_slice::<Value>(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));

    tracing::error!("Error in Business Central proxy: {} {}", status, details);
    Err(ProxyError::Upstream { status, details })
}
