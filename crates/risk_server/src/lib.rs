//! REST API server for FAIR portfolio risk aggregation
//!
//! Exposes the aggregation pipeline of `risk_engine` over HTTP, alongside
//! health and readiness checks.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
