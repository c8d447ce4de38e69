//! Business Central Token Proxy Library
//!
//! Core library for the Business Central reverse proxy with a cached
//! client-credential token.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod proxy;
