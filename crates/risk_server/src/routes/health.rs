//! Health check and readiness endpoints
//!
//! Used by load balancers to decide whether to route aggregation traffic here.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use super::AppState;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("healthy" or "unhealthy")
    pub status: String,
    /// Server version
    pub version: String,
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Simulation limits in force
    pub limits: SimulationLimits,
}

/// Limits applied to each aggregation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationLimits {
    /// Largest accepted trial count
    pub max_simulation_runs: usize,
    /// Wall-clock budget per request
    pub simulation_timeout_ms: u64,
    /// Dedicated pool size, if any
    pub worker_threads: Option<usize>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    /// Ready status
    pub ready: bool,
}

/// Build the health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        limits: SimulationLimits {
            max_simulation_runs: state.config.max_simulation_runs,
            simulation_timeout_ms: state.config.simulation_timeout_ms,
            worker_threads: state.config.worker_threads,
        },
    };

    (StatusCode::OK, Json(response))
}

/// GET /ready
async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(ReadyResponse { ready: true }))
}
