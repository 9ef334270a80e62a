//! Aggregation error taxonomy.
//!
//! Every failure path in the workspace surfaces as one [`AggregationError`].
//! The four top-level kinds map one-to-one onto the machine-readable codes
//! returned to API callers; the nested enums carry the structured cause.

use thiserror::Error;

use crate::math::MatrixError;

/// Top-level error returned by an aggregation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    /// Malformed or empty risk set, bad weights, bad distribution bounds or
    /// bad run parameters.
    #[error("Invalid portfolio: {0}")]
    InvalidPortfolio(#[from] PortfolioError),

    /// Malformed correlation edges.
    #[error("Invalid correlation: {0}")]
    InvalidCorrelation(#[from] CorrelationError),

    /// Numerical failure during decomposition or sampling.
    #[error("Simulation failed: {0}")]
    Simulation(#[from] SimulationFailure),

    /// The run exceeded the caller-provided budget or was cancelled.
    #[error("Simulation cancelled: {0}")]
    SimulationCancelled(#[from] CancellationReason),
}

impl AggregationError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AggregationError::InvalidPortfolio(_) => "INVALID_PORTFOLIO",
            AggregationError::InvalidCorrelation(_) => "INVALID_CORRELATION",
            AggregationError::Simulation(_) => "SIMULATION_ERROR",
            AggregationError::SimulationCancelled(_) => "SIMULATION_CANCELLED",
        }
    }

    /// Whether retrying with a larger budget or fewer trials may succeed.
    ///
    /// Input errors and numerical failures are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AggregationError::SimulationCancelled(_))
    }
}

/// Structured causes of an invalid portfolio.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
    /// Portfolio contains no risk items.
    #[error("Portfolio is empty")]
    EmptyPortfolio,

    /// Two risk items share the same identifier.
    #[error("Duplicate risk ID: {0}")]
    DuplicateRisk(String),

    /// A weight is negative or not finite.
    #[error("Invalid weight for risk {risk_id}: {weight}")]
    InvalidWeight {
        /// Offending risk.
        risk_id: String,
        /// Supplied weight.
        weight: f64,
    },

    /// All weights are zero.
    #[error("Risk weights sum to zero")]
    ZeroWeightSum,

    /// Loss bounds do not describe a valid triangular distribution.
    #[error("Malformed loss distribution for risk {risk_id}: {reason}")]
    MalformedDistribution {
        /// Offending risk.
        risk_id: String,
        /// Description of the violation.
        reason: String,
    },

    /// Risk appetite or tolerance is negative, not finite, or inconsistent.
    #[error("Invalid risk threshold: {0}")]
    InvalidThreshold(String),

    /// A run parameter (trial count, confidence level, ...) is invalid.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        reason: String,
    },
}

/// Structured causes of invalid correlation edges.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrelationError {
    /// Edge correlates a risk with itself.
    #[error("Self-correlation edge for risk {0}")]
    SelfCorrelation(String),

    /// Edge references a risk that is not in the portfolio.
    #[error("Correlation edge {risk_a} <-> {risk_b} references unknown risk {missing}")]
    UnknownRisk {
        /// First endpoint of the edge.
        risk_a: String,
        /// Second endpoint of the edge.
        risk_b: String,
        /// The endpoint that does not exist.
        missing: String,
    },

    /// Coefficient outside [-1, 1] or not finite.
    #[error("Correlation {risk_a} <-> {risk_b} is {value}, must be in [-1, 1]")]
    OutOfRange {
        /// First endpoint of the edge.
        risk_a: String,
        /// Second endpoint of the edge.
        risk_b: String,
        /// Supplied coefficient.
        value: f64,
    },

    /// Edge metadata confidence level outside [0, 1].
    #[error("Correlation {risk_a} <-> {risk_b} has confidence level {value}, must be in [0, 1]")]
    InvalidConfidence {
        /// First endpoint of the edge.
        risk_a: String,
        /// Second endpoint of the edge.
        risk_b: String,
        /// Supplied confidence level.
        value: f64,
    },

    /// More than one edge for the same unordered pair.
    #[error("Duplicate correlation edge for pair {risk_a} <-> {risk_b}")]
    DuplicateEdge {
        /// First endpoint of the edge.
        risk_a: String,
        /// Second endpoint of the edge.
        risk_b: String,
    },
}

/// Numerical failures after the input has been validated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationFailure {
    /// Correlation matrix could not be factorised, even after repair.
    #[error("Correlation matrix decomposition failed: {0}")]
    Decomposition(#[from] MatrixError),

    /// A sampled loss was NaN or infinite.
    #[error("Non-finite loss sample at trial {trial}")]
    NonFiniteSample {
        /// Trial index of the first bad sample.
        trial: usize,
    },

    /// Worker pool could not be created.
    #[error("Worker pool unavailable: {0}")]
    WorkerPool(String),
}

/// Why a run was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancellationReason {
    /// Requested more trials than the run budget allows.
    #[error("requested {requested} trials but the budget allows {budget}")]
    TrialBudgetExceeded {
        /// Trials requested.
        requested: usize,
        /// Trials allowed.
        budget: usize,
    },

    /// Wall-clock budget elapsed between batches.
    #[error("time budget of {budget_ms} ms exceeded")]
    DeadlineExceeded {
        /// Budget in milliseconds.
        budget_ms: u64,
    },

    /// Caller set the cancellation token.
    #[error("cancelled by caller")]
    Requested,
}
