//! Portfolio aggregation orchestration.
//!
//! [`PortfolioAggregator`] runs the full pipeline for one request:
//!
//! ```text
//! AggregationRequest
//!   → RiskInputLoader       (validate, normalise, build matrix)
//!   → MonteCarloEngine      (correlated samples)
//!   → RiskMetricsCalculator (ALE, VaR, ES, ratios)
//!   → ContributionDecomposer
//!   → AggregationReport
//! ```
//!
//! A run either returns a complete report or an error; nothing is published
//! part-way.

use std::sync::OnceLock;
use std::time::Instant;

use chrono::Utc;
use risk_core::portfolio::Portfolio;
use risk_core::types::{AggregationError, PortfolioError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::appetite::AppetiteAssessment;
use crate::config::SimulationConfig;
use crate::contribution::ContributionDecomposer;
use crate::loader::RiskInputLoader;
use crate::metrics::RiskMetricsCalculator;
use crate::report::{AggregationReport, AggregationResult, Diagnostics};
use crate::simulation::{CancellationToken, MonteCarloEngine, WorkerPool};

/// A portfolio plus per-request run parameters.
///
/// Unset parameters fall back to the aggregator's configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRequest {
    /// Portfolio to aggregate.
    #[serde(flatten)]
    pub portfolio: Portfolio,
    /// Number of trials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_runs: Option<usize>,
    /// Confidence levels for VaR and ES.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_levels: Option<Vec<f64>>,
    /// Seed; a random seed is drawn and reported when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl AggregationRequest {
    /// Wraps a portfolio with default run parameters.
    pub fn new(portfolio: Portfolio) -> Self {
        Self {
            portfolio,
            ..Self::default()
        }
    }

    /// Sets the number of trials.
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.simulation_runs = Some(runs);
        self
    }

    /// Sets the confidence levels.
    pub fn with_confidence_levels(mut self, levels: Vec<f64>) -> Self {
        self.confidence_levels = Some(levels);
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Stable hex fingerprint of the request, used to correlate log lines.
    ///
    /// FNV-1a over the canonical JSON encoding.
    pub fn fingerprint(&self) -> String {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        match serde_json::to_vec(self) {
            Ok(bytes) => {
                let hash = bytes
                    .iter()
                    .fold(OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME));
                format!("{:016x}", hash)
            }
            Err(_) => "unavailable".to_string(),
        }
    }
}

/// Runs aggregation requests against a base configuration.
///
/// Every request runs on one worker pool, built on first use (or up front
/// by [`PortfolioAggregator::try_new`]) and shared by clones made after
/// that.
///
/// # Examples
///
/// ```rust
/// use risk_core::portfolio::{PortfolioBuilder, RiskItem};
/// use risk_engine::{AggregationRequest, PortfolioAggregator, SimulationConfig};
///
/// let portfolio = PortfolioBuilder::new()
///     .add_risk(RiskItem::new("R-1", 1.0, 1_000.0, 5_000.0, 20_000.0))
///     .add_risk(RiskItem::new("R-2", 1.0, 500.0, 2_000.0, 9_000.0))
///     .build();
///
/// let aggregator = PortfolioAggregator::new(SimulationConfig::default());
/// let report = aggregator
///     .aggregate(&AggregationRequest::new(portfolio).with_runs(2_000).with_seed(1))
///     .unwrap();
///
/// assert_eq!(report.contributions.len(), 2);
/// assert!(report.result.var_at_confidence(0.99).is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct PortfolioAggregator {
    config: SimulationConfig,
    pool: OnceLock<WorkerPool>,
}

impl PortfolioAggregator {
    /// Creates an aggregator with the given base configuration.
    ///
    /// The worker pool is built by the first request.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            pool: OnceLock::new(),
        }
    }

    /// Creates an aggregator and builds its worker pool immediately.
    ///
    /// # Errors
    ///
    /// `Simulation` if the dedicated pool cannot be started.
    pub fn try_new(config: SimulationConfig) -> Result<Self, AggregationError> {
        let aggregator = Self::new(config);
        aggregator.worker_pool()?;
        Ok(aggregator)
    }

    /// Worker pool every request runs on.
    ///
    /// # Errors
    ///
    /// `Simulation` if the dedicated pool cannot be started.
    pub fn worker_pool(&self) -> Result<&WorkerPool, AggregationError> {
        if let Some(pool) = self.pool.get() {
            return Ok(pool);
        }
        let pool = WorkerPool::for_config(&self.config)?;
        Ok(self.pool.get_or_init(|| pool))
    }

    /// Base configuration.
    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs a request to completion.
    ///
    /// # Errors
    ///
    /// See [`PortfolioAggregator::aggregate_with_token`].
    pub fn aggregate(
        &self,
        request: &AggregationRequest,
    ) -> Result<AggregationReport, AggregationError> {
        self.aggregate_with_token(request, &CancellationToken::new())
    }

    /// Runs a request, stopping at the next batch boundary once `token` is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// - `InvalidPortfolio` / `InvalidCorrelation` for bad input or run
    ///   parameters; no sampling is done
    /// - `Simulation` for numerical failures
    /// - `SimulationCancelled` when the budget or token stops the run
    pub fn aggregate_with_token(
        &self,
        request: &AggregationRequest,
        token: &CancellationToken,
    ) -> Result<AggregationReport, AggregationError> {
        let start = Instant::now();
        let fingerprint = request.fingerprint();

        let config = self.request_config(request).map_err(|e| {
            debug!(fingerprint = %fingerprint, error = %e, "Rejected run parameters");
            e
        })?;

        let model = RiskInputLoader::new(config.default_group_correlation())
            .load(&request.portfolio)
            .map_err(|e| {
                debug!(fingerprint = %fingerprint, code = e.code(), error = %e, "Rejected portfolio");
                e
            })?;

        let output = MonteCarloEngine::new(config.clone())
            .with_pool(self.worker_pool()?.clone())
            .run(&model, token)
            .map_err(|e| {
                match &e {
                    AggregationError::Simulation(_) => {
                        error!(fingerprint = %fingerprint, error = %e, "Simulation failed")
                    }
                    _ => warn!(fingerprint = %fingerprint, error = %e, "Simulation stopped"),
                }
                e
            })?;

        let metrics =
            RiskMetricsCalculator::calculate(&model, &output, config.confidence_levels());
        let contributions =
            ContributionDecomposer::decompose(&model, &output, metrics.diversified_ale);

        let largest_risk_contribution = contributions
            .iter()
            .map(|c| c.percentage_contribution)
            .fold(0.0, f64::max);

        let calculation_time_seconds = start.elapsed().as_secs_f64();
        info!(
            fingerprint = %fingerprint,
            risks = model.risk_count(),
            trials = output.trials(),
            seed = output.seed(),
            diversified_ale = metrics.diversified_ale,
            elapsed_s = calculation_time_seconds,
            "Aggregation complete"
        );

        let result = AggregationResult {
            individual_ale_sum: metrics.individual_ale_sum,
            diversified_ale: metrics.diversified_ale,
            diversification_ratio: metrics.diversification_ratio,
            concentration_index: metrics.concentration_index,
            correlation_benefit: metrics.correlation_benefit,
            tail_metrics: metrics.tail_metrics,
            simulation_runs: output.trials(),
            largest_risk_contribution,
            calculated_at: Utc::now(),
            calculation_time_seconds,
        };

        let headline = result
            .headline_tail()
            .ok_or_else(|| PortfolioError::InvalidParameter {
                name: "confidenceLevels",
                reason: "at least one level is required".to_string(),
            })?;
        let appetite = AppetiteAssessment::assess(
            headline.confidence_level,
            headline.value_at_risk,
            model.risk_appetite(),
            model.risk_tolerance(),
        );

        Ok(AggregationReport {
            portfolio_name: request.portfolio.name.clone(),
            result,
            contributions,
            appetite,
            diagnostics: Diagnostics {
                seed: output.seed(),
                correlation_matrix_was_regularized: output.was_regularized(),
                min_eigenvalue_before_regularization: output.min_eigenvalue(),
                risk_count: model.risk_count(),
                worker_threads: output.worker_threads(),
                input_fingerprint: fingerprint,
            },
        })
    }

    /// Applies request overrides to the base configuration.
    fn request_config(
        &self,
        request: &AggregationRequest,
    ) -> Result<SimulationConfig, AggregationError> {
        let mut builder = self.config.to_builder();
        if let Some(runs) = request.simulation_runs {
            builder = builder.simulation_runs(runs);
        }
        if let Some(levels) = &request.confidence_levels {
            builder = builder.confidence_levels(levels.clone());
        }
        if let Some(seed) = request.seed {
            builder = builder.seed(seed);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appetite::AppetiteStatus;
    use risk_core::portfolio::{PortfolioBuilder, RiskItem};
    use risk_core::types::PortfolioError;

    fn portfolio() -> Portfolio {
        PortfolioBuilder::new()
            .name("Test")
            .risk_appetite(10_000.0)
            .risk_tolerance(20_000.0)
            .add_risk(RiskItem::new("A", 1.0, 1_000.0, 2_000.0, 6_000.0).with_title("Outage"))
            .add_risk(RiskItem::new("B", 1.0, 500.0, 1_000.0, 4_500.0))
            .build()
    }

    #[test]
    fn test_report_is_complete() {
        let request = AggregationRequest::new(portfolio()).with_runs(1_000).with_seed(5);
        let report = PortfolioAggregator::default().aggregate(&request).unwrap();

        assert_eq!(report.portfolio_name.as_deref(), Some("Test"));
        assert_eq!(report.result.simulation_runs, 1_000);
        assert_eq!(report.result.tail_metrics.len(), 2);
        assert_eq!(report.contributions[0].risk_title.as_deref(), Some("Outage"));
        assert_eq!(report.diagnostics.seed, 5);
        assert_eq!(report.diagnostics.risk_count, 2);
        assert_eq!(report.diagnostics.input_fingerprint, request.fingerprint());
        assert_eq!(report.appetite.status, AppetiteStatus::WithinAppetite);
        assert!(report.result.largest_risk_contribution > 0.5);
    }

    #[test]
    fn test_zero_loss_portfolio_has_undefined_ratios() {
        let portfolio = PortfolioBuilder::new()
            .risk_appetite(1.0)
            .add_risk(RiskItem::new("Z1", 1.0, 0.0, 0.0, 0.0))
            .add_risk(RiskItem::new("Z2", 3.0, 0.0, 0.0, 0.0))
            .build();
        let request = AggregationRequest::new(portfolio).with_runs(200).with_seed(9);
        let report = PortfolioAggregator::default().aggregate(&request).unwrap();

        assert_eq!(report.result.diversified_ale, 0.0);
        assert_eq!(report.result.diversification_ratio, None);
        assert_eq!(report.result.correlation_benefit, 0.0);
        assert!(!report.result.tail_metrics.is_empty());
        for tail in &report.result.tail_metrics {
            assert_eq!(tail.value_at_risk, 0.0);
            assert_eq!(tail.tail_diversification_ratio, None);
        }
        assert_eq!(report.result.largest_risk_contribution, 0.0);
        assert_eq!(report.appetite.status, AppetiteStatus::WithinAppetite);
        assert_eq!(report.appetite.value_at_risk, 0.0);
    }

    #[test]
    fn test_requests_share_one_worker_pool() {
        let config = SimulationConfig::builder().worker_threads(2).build().unwrap();
        let aggregator = PortfolioAggregator::try_new(config).unwrap();
        let pool = aggregator.worker_pool().unwrap().clone();
        let shared = aggregator.clone();

        let request = AggregationRequest::new(portfolio()).with_runs(500).with_seed(3);
        let first = aggregator.aggregate(&request).unwrap();
        let second = shared.aggregate(&request).unwrap();

        assert_eq!(aggregator.worker_pool().unwrap(), &pool);
        assert_eq!(shared.worker_pool().unwrap(), &pool);
        assert_eq!(first.diagnostics.worker_threads, 2);
        assert_eq!(first.result.diversified_ale, second.result.diversified_ale);
    }

    #[test]
    fn test_request_seed_overrides_base_seed() {
        let config = SimulationConfig::builder().seed(1).build().unwrap();
        let aggregator = PortfolioAggregator::new(config);

        let base = AggregationRequest::new(portfolio()).with_runs(300);
        assert_eq!(aggregator.aggregate(&base).unwrap().diagnostics.seed, 1);
        let seeded = base.with_seed(77);
        assert_eq!(aggregator.aggregate(&seeded).unwrap().diagnostics.seed, 77);
    }

    #[test]
    fn test_request_overrides_are_validated() {
        let request = AggregationRequest::new(portfolio()).with_runs(0);
        let err = PortfolioAggregator::default().aggregate(&request).unwrap_err();
        assert!(matches!(
            err,
            AggregationError::InvalidPortfolio(PortfolioError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_request_deserialises_flattened_portfolio() {
        let json = r#"{
            "name": "Ops",
            "riskItems": [
                { "riskId": "R1", "weight": 1, "lossMin": 0, "lossMostLikely": 10, "lossMax": 20 }
            ],
            "correlations": [],
            "simulationRuns": 500,
            "confidenceLevels": [0.9],
            "seed": null
        }"#;
        let request: AggregationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.portfolio.name.as_deref(), Some("Ops"));
        assert_eq!(request.portfolio.risk_count(), 1);
        assert_eq!(request.simulation_runs, Some(500));
        assert_eq!(request.confidence_levels, Some(vec![0.9]));
        assert_eq!(request.seed, None);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = AggregationRequest::new(portfolio()).with_seed(1);
        let b = AggregationRequest::new(portfolio()).with_seed(2);
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
    }
}
