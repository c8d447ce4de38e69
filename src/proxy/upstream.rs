//! Upstream URL construction
//!
//! Business Central custom APIs live under
//! `{base}/v2.0/{tenant}/{environment}/api/{publisher}/{group}/{version}/companies({id})`.

use axum::http::{Method, Uri};

/// API publisher and group of the learning extension
const API_ROUTE: &str = "api/alletec/learning";

/// Strip CR, LF and TAB, then trim surrounding whitespace
pub fn clean(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Configured identity of the upstream company API
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    base_url: String,
    tenant_id: String,
    environment: String,
    api_version: String,
    company_id: String,
}

impl UpstreamTarget {
    pub fn new(
        base_url: &str,
        tenant_id: &str,
        environment: &str,
        api_version: &str,
        company_id: &str,
    ) -> Self {
        Self {
            base_url: clean(base_url),
            tenant_id: clean(tenant_id),
            environment: clean(environment),
            api_version: clean(api_version),
            company_id: clean(company_id),
        }
    }

    /// Company-scoped root every endpoint is appended to
    pub fn company_root(&self) -> String {
        format!(
            "{}/v2.0/{}/{}/{}/{}/companies({})",
            self.base_url,
            self.tenant_id,
            self.environment,
            API_ROUTE,
            self.api_version,
            self.company_id
        )
    }

    /// Full upstream URL for an already-split request
    pub fn url_for(&self, request: &ProxyRequest) -> String {
        format!("{}{}{}", self.company_root(), request.path, request.query)
    }
}

/// Inbound request reduced to what gets relayed
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Path with the proxy prefix removed
    pub path: String,
    /// Raw query including the leading `?`, or empty
    pub query: String,
}

impl ProxyRequest {
    /// Split an inbound URI, keeping path and query exactly as received
    ///
    /// Returns `None` when the path is not under `prefix`.
    pub fn from_uri(method: Method, uri: &Uri, prefix: &str) -> Option<Self> {
        let rest = uri.path().strip_prefix(prefix)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }

        let query = uri.query().map(|q| format!("?{}", q)).unwrap_or_default();

        Some(Self {
            method,
            path: clean(rest),
            query: clean(&query),
        })
    }

    /// Whether the inbound body travels upstream
    pub fn forwards_body(&self) -> bool {
        forwards_body(&self.method)
    }
}

/// Only POST, PUT and PATCH carry a body upstream
pub fn forwards_body(method: &Method) -> bool {
    ["POST", "PUT", "PATCH"]
        .iter()
        .any(|m| method.as_str().eq_ignore_ascii_case(m))
}
