//! Configuration parsing and validation

use crate::error::{ProxyError, Result};
use crate::proxy::upstream::{clean, UpstreamTarget};
use clap::Parser;

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_SCOPE: &str = "https://api.businesscentral.dynamics.com/.default";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bc-token-proxy",
    version,
    about = "Business Central REST proxy with a cached OAuth token",
    long_about = "Reverse proxy that forwards /api/* calls to a Business Central company API, authenticating with a client-credential token cached in Redis"
)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Business Central base URL (e.g., https://api.businesscentral.dynamics.com)
    #[arg(long, env = "BC_BASE_URL")]
    pub bc_base_url: String,

    /// Azure AD tenant id
    #[arg(long, env = "BC_TENANT_ID")]
    pub bc_tenant_id: String,

    /// Business Central environment name (e.g., Production)
    #[arg(long, env = "BC_ENVIRONMENT")]
    pub bc_environment: String,

    /// Version of the custom learning API (e.g., v1.0)
    #[arg(long, env = "BC_API_VERSION")]
    pub bc_api_version: String,

    /// Company id all requests are scoped to
    #[arg(long, env = "BC_COMPANY_ID")]
    pub bc_company_id: String,

    /// App registration client id
    #[arg(long, env = "BC_CLIENT_ID")]
    pub bc_client_id: String,

    /// App registration client secret
    #[arg(long, env = "BC_CLIENT_SECRET", hide_env_values = true)]
    pub bc_client_secret: String,

    /// Identity provider host (default: https://login.microsoftonline.com)
    #[arg(long, env = "BC_AUTHORITY_HOST")]
    pub authority_host: Option<String>,

    /// Tenant used for the token request (default: the Business Central tenant id)
    #[arg(long, env = "BC_AUTHORITY_TENANT")]
    pub authority_tenant: Option<String>,

    /// Token scope (default: https://api.businesscentral.dynamics.com/.default)
    #[arg(long, env = "BC_SCOPE")]
    pub scope: Option<String>,

    /// Redis connection string for the shared token cache
    #[arg(long, env = "REDIS_URL", conflicts_with = "memory_cache")]
    pub redis_url: Option<String>,

    /// Cache the token in process memory instead of Redis
    #[arg(long, env = "BC_MEMORY_CACHE")]
    pub memory_cache: bool,

    /// Comma-separated origins allowed to call the proxy; empty disables CORS
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub cors_allowed_origins: Vec<String>,

    /// Path prefix of proxied requests
    #[arg(long, env = "BC_PROXY_PREFIX", default_value = "/api")]
    pub path_prefix: String,

    /// Timeout for calls to Business Central, in seconds
    #[arg(long, env = "BC_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Retry a request once with a fresh token after a 401
    #[arg(long, env = "BC_RETRY_ON_UNAUTHORIZED")]
    pub retry_on_unauthorized: bool,

    /// Answer every successful call with 200 instead of the upstream status
    #[arg(long, env = "BC_FLATTEN_SUCCESS_STATUS")]
    pub flatten_success_status: bool,

    /// Don't show the startup banner
    #[arg(long)]
    pub no_banner: bool,

    /// Show only error messages
    #[arg(long, conflicts_with = "debug")]
    pub silent: bool,

    /// Enable debug logging
    #[arg(long, env = "BC_PROXY_DEBUG")]
    pub debug: bool,
}

/// Which token store backs the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode {
    Redis(String),
    Memory,
    Disabled,
}

impl Config {
    /// Parse configuration from CLI arguments and environment variables
    pub fn parse_args() -> Self {
        Config::parse()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("BC_BASE_URL", &self.bc_base_url),
            ("BC_TENANT_ID", &self.bc_tenant_id),
            ("BC_ENVIRONMENT", &self.bc_environment),
            ("BC_API_VERSION", &self.bc_api_version),
            ("BC_COMPANY_ID", &self.bc_company_id),
            ("BC_CLIENT_ID", &self.bc_client_id),
            ("BC_CLIENT_SECRET", &self.bc_client_secret),
        ];
        for (name, value) in required {
            if clean(value).is_empty() {
                return Err(ProxyError::Config(format!("{} is required", name)));
            }
        }

        url::Url::parse(&clean(&self.bc_base_url))
            .map_err(|e| ProxyError::Config(format!("Invalid Business Central base URL: {}", e)))?;

        url::Url::parse(&self.token_endpoint())
            .map_err(|e| ProxyError::Config(format!("Invalid token endpoint: {}", e)))?;

        if let CacheMode::Redis(url) = self.cache_mode() {
            url::Url::parse(&url)
                .map_err(|e| ProxyError::Config(format!("Invalid Redis URL: {}", e)))?;
        }

        let prefix = &self.path_prefix;
        if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
            return Err(ProxyError::Config(format!(
                "Path prefix must start with '/' and not end with '/': {:?}",
                prefix
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ProxyError::Config(
                "Request timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }

    /// Upstream company API the proxy forwards to
    pub fn upstream_target(&self) -> UpstreamTarget {
        UpstreamTarget::new(
            &self.bc_base_url,
            &self.bc_tenant_id,
            &self.bc_environment,
            &self.bc_api_version,
            &self.bc_company_id,
        )
    }

    /// Azure AD v2 token endpoint for the client-credential grant
    pub fn token_endpoint(&self) -> String {
        let host = self
            .authority_host
            .as_deref()
            .map(clean)
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());
        let tenant = self
            .authority_tenant
            .as_deref()
            .map(clean)
            .unwrap_or_else(|| clean(&self.bc_tenant_id));

        format!("{}/{}/oauth2/v2.0/token", host.trim_end_matches('/'), tenant)
    }

    /// Get token scope (with default)
    pub fn scope(&self) -> String {
        self.scope
            .as_deref()
            .map(clean)
            .unwrap_or_else(|| DEFAULT_SCOPE.to_string())
    }

    pub fn client_id(&self) -> String {
        clean(&self.bc_client_id)
    }

    pub fn client_secret(&self) -> String {
        clean(&self.bc_client_secret)
    }

    pub fn cache_mode(&self) -> CacheMode {
        match self.redis_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => CacheMode::Redis(url.to_string()),
            _ if self.memory_cache => CacheMode::Memory,
            _ => CacheMode::Disabled,
        }
    }

    /// CORS origins with blanks dropped
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get log level based on flags
    pub fn log_level(&self) -> tracing::Level {
        if self.silent {
            tracing::Level::ERROR
        } else if self.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
