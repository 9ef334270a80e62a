//! API error responses
//!
//! Every failure leaves the server as a JSON body `{ "code", "message" }`
//! with a status derived from the aggregation error kind.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use risk_core::types::AggregationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Body could not be parsed as a portfolio
    #[error("Malformed request body: {0}")]
    BadRequest(String),

    /// Failure outside the aggregation pipeline, e.g. a panicked worker
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code
    pub code: String,
    /// Human-readable description
    pub message: String,
}

impl ServerError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Aggregation(e) => match e {
                AggregationError::InvalidPortfolio(_) | AggregationError::InvalidCorrelation(_) => {
                    StatusCode::BAD_REQUEST
                }
                AggregationError::Simulation(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AggregationError::SimulationCancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Aggregation(e) => e.code(),
            ServerError::BadRequest(_) => "INVALID_PORTFOLIO",
            ServerError::Internal(_) => "SIMULATION_ERROR",
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServerError::Internal(detail) => {
                error!(detail = %detail, "Internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            code: self.code().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}
