//! Upstream authentication module

pub mod client;
pub mod manager;
pub mod token;

pub use client::{ClientCredentialsClient, TokenProvider};
pub use manager::{TokenCacheManager, TOKEN_CACHE_KEY};
pub use token::{AccessToken, TokenResponse, FALLBACK_TTL_SECS};
