//! Simulation configuration.
//!
//! This module provides [`SimulationConfig`], its builder, and the
//! [`RunBudget`] that bounds how much work a single run may do.

use std::time::Duration;

use risk_core::math::DEFAULT_EIGENVALUE_FLOOR;
use risk_core::types::{CancellationReason, PortfolioError};

/// Default number of Monte Carlo trials.
pub const DEFAULT_SIMULATION_RUNS: usize = 10_000;

/// Maximum number of Monte Carlo trials allowed.
pub const MAX_SIMULATION_RUNS: usize = 1_000_000;

/// Confidence levels reported when none are requested.
pub const DEFAULT_CONFIDENCE_LEVELS: [f64; 2] = [0.95, 0.99];

/// Correlation applied to risks that share a correlation group and have no
/// explicit edge.
pub const DEFAULT_GROUP_CORRELATION: f64 = 0.1;

/// Trials per parallel batch.
pub const DEFAULT_BATCH_SIZE: usize = 512;

/// Upper bounds on the work a single run may perform.
///
/// A trial budget below the requested trial count is rejected before any
/// sampling starts. The time budget is checked between batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunBudget {
    max_trials: Option<usize>,
    max_duration: Option<Duration>,
}

impl RunBudget {
    /// A budget with no limits.
    #[inline]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Limits the number of trials.
    #[inline]
    pub fn with_max_trials(mut self, max_trials: usize) -> Self {
        self.max_trials = Some(max_trials);
        self
    }

    /// Limits the wall-clock duration.
    #[inline]
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Returns the trial limit, if any.
    #[inline]
    pub fn max_trials(&self) -> Option<usize> {
        self.max_trials
    }

    /// Returns the time limit, if any.
    #[inline]
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    /// Checks a requested trial count against the trial limit.
    ///
    /// # Errors
    ///
    /// `CancellationReason::TrialBudgetExceeded` if `requested` exceeds the
    /// limit.
    pub fn check_trials(&self, requested: usize) -> Result<(), CancellationReason> {
        match self.max_trials {
            Some(budget) if requested > budget => {
                Err(CancellationReason::TrialBudgetExceeded { requested, budget })
            }
            _ => Ok(()),
        }
    }

    /// Checks elapsed time against the time limit.
    ///
    /// # Errors
    ///
    /// `CancellationReason::DeadlineExceeded` once `elapsed` passes the
    /// limit.
    pub fn check_elapsed(&self, elapsed: Duration) -> Result<(), CancellationReason> {
        match self.max_duration {
            Some(limit) if elapsed > limit => Err(CancellationReason::DeadlineExceeded {
                budget_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
            _ => Ok(()),
        }
    }
}

/// Monte Carlo aggregation configuration.
///
/// Immutable once built. Use [`SimulationConfigBuilder`] to construct
/// instances; validation happens at [`SimulationConfigBuilder::build`].
///
/// # Examples
///
/// ```rust
/// use risk_engine::config::SimulationConfig;
///
/// let config = SimulationConfig::builder()
///     .simulation_runs(20_000)
///     .confidence_levels(vec![0.99, 0.95, 0.99])
///     .seed(42)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.simulation_runs(), 20_000);
/// assert_eq!(config.confidence_levels(), &[0.95, 0.99]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    simulation_runs: usize,
    confidence_levels: Vec<f64>,
    seed: Option<u64>,
    default_group_correlation: f64,
    eigenvalue_floor: f64,
    batch_size: usize,
    worker_threads: Option<usize>,
    budget: RunBudget,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulation_runs: DEFAULT_SIMULATION_RUNS,
            confidence_levels: DEFAULT_CONFIDENCE_LEVELS.to_vec(),
            seed: None,
            default_group_correlation: DEFAULT_GROUP_CORRELATION,
            eigenvalue_floor: DEFAULT_EIGENVALUE_FLOOR,
            batch_size: DEFAULT_BATCH_SIZE,
            worker_threads: None,
            budget: RunBudget::unlimited(),
        }
    }
}

impl SimulationConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Number of Monte Carlo trials.
    #[inline]
    pub fn simulation_runs(&self) -> usize {
        self.simulation_runs
    }

    /// Confidence levels, ascending and de-duplicated.
    #[inline]
    pub fn confidence_levels(&self) -> &[f64] {
        &self.confidence_levels
    }

    /// Seed, or `None` for a fresh random seed per run.
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Correlation used for same-group pairs without an explicit edge.
    #[inline]
    pub fn default_group_correlation(&self) -> f64 {
        self.default_group_correlation
    }

    /// Smallest eigenvalue kept when repairing the correlation matrix.
    #[inline]
    pub fn eigenvalue_floor(&self) -> f64 {
        self.eigenvalue_floor
    }

    /// Trials per parallel batch.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Dedicated worker pool size, or `None` for the global rayon pool.
    #[inline]
    pub fn worker_threads(&self) -> Option<usize> {
        self.worker_threads
    }

    /// Run budget.
    #[inline]
    pub fn budget(&self) -> RunBudget {
        self.budget
    }

    /// Returns a builder pre-populated with this configuration.
    pub fn to_builder(&self) -> SimulationConfigBuilder {
        SimulationConfigBuilder {
            simulation_runs: Some(self.simulation_runs),
            confidence_levels: Some(self.confidence_levels.clone()),
            seed: self.seed,
            default_group_correlation: Some(self.default_group_correlation),
            eigenvalue_floor: Some(self.eigenvalue_floor),
            batch_size: Some(self.batch_size),
            worker_threads: self.worker_threads,
            budget: self.budget,
        }
    }
}

/// Builder for [`SimulationConfig`].
///
/// Unset fields take the module defaults.
#[derive(Clone, Debug, Default)]
pub struct SimulationConfigBuilder {
    simulation_runs: Option<usize>,
    confidence_levels: Option<Vec<f64>>,
    seed: Option<u64>,
    default_group_correlation: Option<f64>,
    eigenvalue_floor: Option<f64>,
    batch_size: Option<usize>,
    worker_threads: Option<usize>,
    budget: RunBudget,
}

impl SimulationConfigBuilder {
    /// Sets the number of trials, in `[1, 1_000_000]`.
    #[inline]
    pub fn simulation_runs(mut self, runs: usize) -> Self {
        self.simulation_runs = Some(runs);
        self
    }

    /// Sets the confidence levels, each in `(0, 1)`.
    #[inline]
    pub fn confidence_levels(mut self, levels: Vec<f64>) -> Self {
        self.confidence_levels = Some(levels);
        self
    }

    /// Sets the seed.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets or clears the seed.
    #[inline]
    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the same-group default correlation, in `[-1, 1]`.
    #[inline]
    pub fn default_group_correlation(mut self, rho: f64) -> Self {
        self.default_group_correlation = Some(rho);
        self
    }

    /// Sets the eigenvalue floor used for matrix repair.
    #[inline]
    pub fn eigenvalue_floor(mut self, floor: f64) -> Self {
        self.eigenvalue_floor = Some(floor);
        self
    }

    /// Sets the number of trials per parallel batch.
    #[inline]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Runs on a dedicated pool with this many threads.
    #[inline]
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Sets the run budget.
    #[inline]
    pub fn budget(mut self, budget: RunBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// `PortfolioError::InvalidParameter` if:
    /// - the trial count is 0 or above [`MAX_SIMULATION_RUNS`]
    /// - the confidence list is empty or has a level outside `(0, 1)`
    /// - the group correlation is outside `[-1, 1]`
    /// - the eigenvalue floor is not positive
    /// - the batch size or worker count is 0
    pub fn build(self) -> Result<SimulationConfig, PortfolioError> {
        let simulation_runs = self.simulation_runs.unwrap_or(DEFAULT_SIMULATION_RUNS);
        if simulation_runs == 0 || simulation_runs > MAX_SIMULATION_RUNS {
            return Err(invalid(
                "simulationRuns",
                format!(
                    "{} is outside [1, {}]",
                    simulation_runs, MAX_SIMULATION_RUNS
                ),
            ));
        }

        let confidence_levels = normalise_confidence_levels(
            self.confidence_levels
                .unwrap_or_else(|| DEFAULT_CONFIDENCE_LEVELS.to_vec()),
        )?;

        let default_group_correlation = self
            .default_group_correlation
            .unwrap_or(DEFAULT_GROUP_CORRELATION);
        if !default_group_correlation.is_finite() || default_group_correlation.abs() > 1.0 {
            return Err(invalid(
                "defaultGroupCorrelation",
                format!("{} is outside [-1, 1]", default_group_correlation),
            ));
        }

        let eigenvalue_floor = self.eigenvalue_floor.unwrap_or(DEFAULT_EIGENVALUE_FLOOR);
        if !eigenvalue_floor.is_finite() || eigenvalue_floor <= 0.0 {
            return Err(invalid(
                "eigenvalueFloor",
                format!("{} must be positive", eigenvalue_floor),
            ));
        }

        let batch_size = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(invalid("batchSize", "must be at least 1".to_string()));
        }

        if self.worker_threads == Some(0) {
            return Err(invalid("workerThreads", "must be at least 1".to_string()));
        }

        Ok(SimulationConfig {
            simulation_runs,
            confidence_levels,
            seed: self.seed,
            default_group_correlation,
            eigenvalue_floor,
            batch_size,
            worker_threads: self.worker_threads,
            budget: self.budget,
        })
    }
}

fn invalid(name: &'static str, reason: String) -> PortfolioError {
    PortfolioError::InvalidParameter { name, reason }
}

/// Validates, sorts and de-duplicates confidence levels.
fn normalise_confidence_levels(mut levels: Vec<f64>) -> Result<Vec<f64>, PortfolioError> {
    if levels.is_empty() {
        return Err(invalid(
            "confidenceLevels",
            "at least one level is required".to_string(),
        ));
    }
    if let Some(bad) = levels
        .iter()
        .find(|p| !p.is_finite() || **p <= 0.0 || **p >= 1.0)
    {
        return Err(invalid(
            "confidenceLevels",
            format!("{} is outside (0, 1)", bad),
        ));
    }
    levels.sort_by(|a, b| a.total_cmp(b));
    levels.dedup();
    Ok(levels)
}
