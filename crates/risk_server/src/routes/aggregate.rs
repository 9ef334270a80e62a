//! Portfolio aggregation endpoint
//!
//! `POST /api/v1/portfolio/aggregate` takes a portfolio plus optional run
//! parameters and returns the full aggregation report. Sampling runs on the
//! blocking pool so the async workers stay free for other requests.

use axum::{extract::rejection::JsonRejection, extract::State, response::Json, routing::post, Router};
use risk_engine::{AggregationReport, AggregationRequest, CancellationToken};
use tracing::{info, info_span};
use uuid::Uuid;

use super::AppState;
use crate::error::ServerError;

/// Build the aggregation routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/portfolio/aggregate", post(aggregate_handler))
}

/// Cancels the run when the handler future is dropped, e.g. on client disconnect.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// POST /api/v1/portfolio/aggregate
async fn aggregate_handler(
    State(state): State<AppState>,
    payload: Result<Json<AggregationRequest>, JsonRejection>,
) -> Result<Json<AggregationReport>, ServerError> {
    let Json(request) = payload?;

    let request_id = Uuid::new_v4();
    let span = info_span!("aggregate", request_id = %request_id);
    info!(
        parent: &span,
        risks = request.portfolio.risk_count(),
        edges = request.portfolio.correlations.len(),
        runs = ?request.simulation_runs,
        "Aggregation requested"
    );

    let token = CancellationToken::new();
    let _guard = CancelOnDrop(token.clone());
    let aggregator = state.aggregator.clone();

    let report = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        aggregator.aggregate_with_token(&request, &token)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("aggregation task failed: {}", e)))??;

    Ok(Json(report))
}
