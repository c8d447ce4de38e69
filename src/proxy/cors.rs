//! CORS allow-list

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::{ProxyError, Result};

/// Allowed origins plus the CORS layer answering for them
#[derive(Clone, Debug)]
pub struct CorsPolicy {
    allowed: Arc<Vec<HeaderValue>>,
    layer: CorsLayer,
}

impl CorsPolicy {
    /// Wrap `router` so unlisted origins are refused before anything is forwarded
    pub fn apply(self, router: Router) -> Router {
        router
            .layer(self.layer)
            .layer(middleware::from_fn_with_state(
                self.allowed,
                reject_unlisted_origin,
            ))
    }

    pub fn allows(&self, origin: &HeaderValue) -> bool {
        self.allowed.contains(origin)
    }
}

/// Build a CORS policy that admits only the listed origins
///
/// Returns `None` for an empty list: the proxy then adds no CORS headers at all.
pub fn cors_policy(origins: &[String]) -> Result<Option<CorsPolicy>> {
    if origins.is_empty() {
        return Ok(None);
    }

    let allowed = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim().trim_end_matches('/'))
                .map_err(|e| ProxyError::Config(format!("Invalid CORS origin {:?}: {}", origin, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let layer = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed.clone()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    Ok(Some(CorsPolicy {
        allowed: Arc::new(allowed),
        layer,
    }))
}

/// Requests without an `Origin` header (curl, server-to-server) pass through
async fn reject_unlisted_origin(
    State(allowed): State<Arc<Vec<HeaderValue>>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !allowed.contains(origin) {
            let origin = String::from_utf8_lossy(origin.as_bytes()).into_owned();
            tracing::warn!("Rejected request from origin {}", origin);
            return Err(ProxyError::OriginNotAllowed(origin));
        }
    }

    Ok(next.run(request).await)
}
