//! Business Central Token Proxy - Main entry point
//!
//! Forwards the learning dashboard's `/api/*` calls to a Business Central
//! company API, authenticating with a client-credential token that is cached
//! (in Redis when configured) until it expires or upstream rejects it.

use bc_token_proxy::auth::{ClientCredentialsClient, TokenCacheManager};
use bc_token_proxy::cache::{MemoryStore, RedisStore, TokenStore};
use bc_token_proxy::config::{CacheMode, Config};
use bc_token_proxy::error::Result;
use bc_token_proxy::proxy::{self, AppState};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const BANNER: &str = r#"
╔══════════════════════════════════════════════════════════════╗
║                 Business Central Token Proxy                 ║
║        client-credential auth with a shared token cache      ║
╚══════════════════════════════════════════════════════════════╝
"#;

fn setup_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}", config.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let config = Config::parse_args();

    // Set up logging
    setup_logging(&config);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    if !config.no_banner && !config.silent {
        println!("{}", BANNER);
        info!("Business Central API: {}", config.upstream_target().company_root());
        info!("Token endpoint: {}", config.token_endpoint());
        info!("Client ID: {}", config.client_id());
        info!("Scope: {}", config.scope());
        println!();
    }

    if let Err(e) = run(config).await {
        error!("Proxy error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let provider = ClientCredentialsClient::new(
        config.token_endpoint(),
        config.client_id(),
        config.client_secret(),
        config.scope(),
    )?;

    let store = open_store(&config).await;
    let tokens = Arc::new(TokenCacheManager::new(Arc::new(provider), store));

    let state = AppState::from_config(&config, tokens.clone())?;
    let cors = proxy::cors_policy(&config.cors_origins())?;
    if cors.is_none() {
        info!("No CORS allow-list configured, CORS enforcement disabled");
    }
    let app = proxy::build_router(Arc::new(state), cors);

    let result = proxy::run_proxy_server(&config, app, shutdown_signal()).await;

    // Close the cache connection before exit
    tokens.close().await;
    result
}

/// Pick the token store; an unreachable Redis degrades to no cache
async fn open_store(config: &Config) -> Option<Arc<dyn TokenStore>> {
    match config.cache_mode() {
        CacheMode::Redis(url) => match RedisStore::connect(&url).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!("{} - continuing without a token cache", e);
                None
            }
        },
        CacheMode::Memory => {
            info!("Using in-process token cache");
            Some(Arc::new(MemoryStore::new()))
        }
        CacheMode::Disabled => {
            info!("Token cache disabled, acquiring a token for every request");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}
