//! Route modules for the risk server
//!
//! - aggregate: portfolio aggregation endpoint
//! - health: health check and readiness endpoints

pub mod aggregate;
pub mod health;

use axum::Router;
use risk_engine::PortfolioAggregator;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, ServerConfig};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Aggregator built once from the configuration
    pub aggregator: Arc<PortfolioAggregator>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create a new AppState
    pub fn new(config: Arc<ServerConfig>) -> Result<Self, ConfigError> {
        let aggregator = Arc::new(config.aggregator()?);
        Ok(Self {
            config,
            aggregator,
            start_time: std::time::Instant::now(),
        })
    }
}

/// Build the main application router by merging all route modules
pub fn build_router(config: Arc<ServerConfig>) -> Result<Router, ConfigError> {
    let state = AppState::new(config)?;

    Ok(Router::new()
        .merge(health::routes())
        .merge(aggregate::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
