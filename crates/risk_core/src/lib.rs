//! # Risk Core (Foundation)
//!
//! Data model and numerical building blocks for FAIR portfolio risk
//! aggregation.
//!
//! This crate provides:
//! - Strongly-typed risk identifiers
//! - Portfolio input records (risk items, correlation edges, FAIR factors)
//! - The aggregation error taxonomy shared by every layer
//! - Standard normal and triangular distributions
//! - Correlation matrices with eigenvalue-clipping repair and Cholesky factors
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              risk_core                  │
//! ├─────────────────────────────────────────┤
//! │  types/      - RiskId, error taxonomy   │
//! │  portfolio/  - RiskItem, Correlation-   │
//! │                Edge, Portfolio, bands   │
//! │  math/       - norm_cdf, Triangular,    │
//! │                CorrelationMatrix        │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │             risk_engine                 │
//! │  Monte Carlo aggregation under a        │
//! │  Gaussian copula                        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use risk_core::portfolio::{CorrelationEdge, PortfolioBuilder, RiskItem};
//!
//! let portfolio = PortfolioBuilder::new()
//!     .name("Payments platform")
//!     .add_risk(RiskItem::new("R-001", 1.0, 10_000.0, 50_000.0, 250_000.0))
//!     .add_risk(RiskItem::new("R-002", 1.0, 5_000.0, 20_000.0, 80_000.0))
//!     .add_correlation(CorrelationEdge::new("R-001", "R-002", 0.3))
//!     .build();
//!
//! assert_eq!(portfolio.risk_count(), 2);
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod math;
pub mod portfolio;
pub mod types;

pub use math::{norm_cdf, CholeskyFactor, CorrelationMatrix, MatrixError, Regularized, Triangular};
pub use portfolio::{
    CorrelationEdge, FairFactors, Portfolio, PortfolioBuilder, RiskItem, SeverityBand,
    ThreePointEstimate,
};
pub use types::{
    AggregationError, CancellationReason, CorrelationError, PortfolioError, RiskId,
    SimulationFailure,
};
