//! # Risk Engine (Kernel)
//!
//! Monte Carlo aggregation of FAIR-style risks under a Gaussian copula.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │ RiskInputLoader  │ → │ MonteCarloEngine │ → │ RiskMetrics-     │
//! │ validate, weights│   │ copula sampling  │   │ Calculator       │
//! │ correlation      │   │ (rayon batches)  │   │ ALE, VaR, ES     │
//! └──────────────────┘   └──────────────────┘   └────────┬─────────┘
//!                                                        ↓
//!                        ┌──────────────────┐   ┌──────────────────┐
//!                        │ AggregationReport│ ← │ Contribution-    │
//!                        │                  │   │ Decomposer       │
//!                        └──────────────────┘   └──────────────────┘
//! ```
//!
//! [`PortfolioAggregator`] wires the stages together. Results are
//! reproducible: with a fixed seed a run returns bit-identical numbers
//! regardless of the worker count.
//!
//! ## Example
//!
//! ```rust
//! use risk_core::portfolio::{CorrelationEdge, PortfolioBuilder, RiskItem};
//! use risk_engine::{AggregationRequest, PortfolioAggregator};
//!
//! let portfolio = PortfolioBuilder::new()
//!     .add_risk(RiskItem::new("R-001", 1.0, 10_000.0, 50_000.0, 250_000.0))
//!     .add_risk(RiskItem::new("R-002", 1.0, 5_000.0, 20_000.0, 80_000.0))
//!     .add_correlation(CorrelationEdge::new("R-001", "R-002", 0.3))
//!     .build();
//!
//! let request = AggregationRequest::new(portfolio).with_runs(5_000).with_seed(42);
//! let report = PortfolioAggregator::default().aggregate(&request).unwrap();
//!
//! let var99 = report.result.var_at_confidence(0.99).unwrap();
//! let var95 = report.result.var_at_confidence(0.95).unwrap();
//! assert!(var99 >= var95);
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod aggregator;
pub mod appetite;
pub mod config;
pub mod contribution;
pub mod loader;
pub mod metrics;
pub mod report;
pub mod rng;
pub mod simulation;

pub use aggregator::{AggregationRequest, PortfolioAggregator};
pub use appetite::{AppetiteAssessment, AppetiteStatus};
pub use config::{
    RunBudget, SimulationConfig, SimulationConfigBuilder, DEFAULT_SIMULATION_RUNS,
    MAX_SIMULATION_RUNS,
};
pub use contribution::ContributionDecomposer;
pub use loader::{LoadedRisk, RiskInputLoader, SimulationModel};
pub use metrics::{PortfolioMetrics, RiskMetricsCalculator};
pub use report::{AggregationReport, AggregationResult, Diagnostics, RiskContribution, TailMetric};
pub use simulation::{CancellationToken, MonteCarloEngine, SimulationOutput, WorkerPool};
