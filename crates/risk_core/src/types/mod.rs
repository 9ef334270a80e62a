//! Identifier and error types shared across the workspace.

mod error;
mod ids;

pub use error::{
    AggregationError, CancellationReason, CorrelationError, PortfolioError, SimulationFailure,
};
pub use ids::RiskId;
