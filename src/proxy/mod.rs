//! Request forwarding to Business Central

pub mod cors;
pub mod server;
pub mod upstream;

pub use cors::{cors_policy, CorsPolicy};
pub use server::{build_router, run_proxy_server, AppState};
pub use upstream::{ProxyRequest, UpstreamTarget};
