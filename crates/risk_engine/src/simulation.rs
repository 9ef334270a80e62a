//! Monte Carlo Simulation Engine.
//!
//! Samples correlated annual losses under a Gaussian copula:
//!
//! 1. repair the correlation matrix by eigenvalue clipping when needed
//! 2. factorise it as `C = L Lᵀ`
//! 3. per trial, draw `z ~ N(0, I)`, correlate `x = L z`, map `u = Φ(x)`,
//!    then `loss_i = w_i · F_i⁻¹(u_i)` for each risk's triangular `F_i`
//!
//! Trials are split into fixed-size batches and run on rayon. Batches are
//! collected in trial order and each trial has its own RNG stream, so the
//! output does not depend on the number of workers.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use risk_core::math::{norm_cdf, CholeskyFactor};
use risk_core::types::{AggregationError, CancellationReason, SimulationFailure};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::loader::SimulationModel;
use crate::rng::{random_seed, TrialRng};

/// Cooperative cancellation flag shared between a caller and a run.
///
/// Cloning yields a handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Takes effect at the next batch boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Retained samples of a completed run.
#[derive(Clone, Debug)]
pub struct SimulationOutput {
    portfolio_losses: Vec<f64>,
    weighted_losses: Vec<f64>,
    risk_count: usize,
    seed: u64,
    was_regularized: bool,
    min_eigenvalue: f64,
    worker_threads: usize,
}

impl SimulationOutput {
    /// Number of trials.
    #[inline]
    pub fn trials(&self) -> usize {
        self.portfolio_losses.len()
    }

    /// Number of risks per trial.
    #[inline]
    pub fn risk_count(&self) -> usize {
        self.risk_count
    }

    /// Portfolio loss of every trial, in trial order.
    #[inline]
    pub fn portfolio_losses(&self) -> &[f64] {
        &self.portfolio_losses
    }

    /// Weighted per-risk losses of one trial.
    #[inline]
    pub fn trial_losses(&self, trial: usize) -> &[f64] {
        let n = self.risk_count;
        &self.weighted_losses[trial * n..(trial + 1) * n]
    }

    /// Iterates over the weighted per-risk losses of every trial.
    pub fn iter_trials(&self) -> impl Iterator<Item = &[f64]> {
        self.weighted_losses.chunks_exact(self.risk_count.max(1))
    }

    /// Weighted losses of one risk across all trials.
    pub fn risk_losses(&self, risk: usize) -> Vec<f64> {
        self.iter_trials().map(|row| row[risk]).collect()
    }

    /// Seed the run used.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether the correlation matrix had to be repaired.
    #[inline]
    pub fn was_regularized(&self) -> bool {
        self.was_regularized
    }

    /// Smallest eigenvalue of the correlation matrix before repair.
    #[inline]
    pub fn min_eigenvalue(&self) -> f64 {
        self.min_eigenvalue
    }

    /// Size of the worker pool the run executed on.
    #[inline]
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }
}

struct BatchSamples {
    portfolio: Vec<f64>,
    weighted: Vec<f64>,
}

/// Thread pool simulations run on.
///
/// Either rayon's global pool or a dedicated pool built once and shared by
/// every clone. Two handles compare equal when they run on the same pool.
#[derive(Clone, Debug, Default)]
pub struct WorkerPool {
    dedicated: Option<Arc<rayon::ThreadPool>>,
}

impl WorkerPool {
    /// Handle to rayon's global pool.
    pub fn global() -> Self {
        Self::default()
    }

    /// Builds a dedicated pool of `threads` workers.
    ///
    /// # Errors
    ///
    /// `Simulation` if the operating system refuses the threads.
    pub fn dedicated(threads: usize) -> Result<Self, AggregationError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("risk-sim-{}", i))
            .build()
            .map_err(|e| SimulationFailure::WorkerPool(e.to_string()))?;
        debug!(threads, "Worker pool started");
        Ok(Self {
            dedicated: Some(Arc::new(pool)),
        })
    }

    /// Pool matching `config.worker_threads()`.
    ///
    /// # Errors
    ///
    /// See [`WorkerPool::dedicated`].
    pub fn for_config(config: &SimulationConfig) -> Result<Self, AggregationError> {
        match config.worker_threads() {
            Some(threads) => Self::dedicated(threads),
            None => Ok(Self::global()),
        }
    }

    /// Number of workers.
    pub fn threads(&self) -> usize {
        match &self.dedicated {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.dedicated {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl PartialEq for WorkerPool {
    fn eq(&self, other: &Self) -> bool {
        match (&self.dedicated, &other.dedicated) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Gaussian copula Monte Carlo engine.
#[derive(Clone, Debug)]
pub struct MonteCarloEngine {
    config: SimulationConfig,
    pool: Option<WorkerPool>,
}

impl MonteCarloEngine {
    /// Creates an engine for the given configuration.
    ///
    /// Without an attached pool, each run builds the pool the configuration
    /// asks for. Use [`MonteCarloEngine::with_pool`] to run repeatedly on one
    /// pool.
    pub fn new(config: SimulationConfig) -> Self {
        Self { config, pool: None }
    }

    /// Runs on `pool` instead of building one per run.
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs the simulation.
    ///
    /// # Errors
    ///
    /// - `SimulationCancelled` if the trial budget is below the requested
    ///   trial count, the time budget runs out, or `token` is set
    /// - `Simulation` if the matrix cannot be factorised, a sample is not
    ///   finite, or the worker pool cannot be created
    pub fn run(
        &self,
        model: &SimulationModel,
        token: &CancellationToken,
    ) -> Result<SimulationOutput, AggregationError> {
        let runs = self.config.simulation_runs();
        let budget = self.config.budget();
        budget.check_trials(runs)?;
        if token.is_cancelled() {
            return Err(CancellationReason::Requested.into());
        }

        let repaired = model
            .correlation()
            .regularize(self.config.eigenvalue_floor());
        if repaired.was_regularized {
            debug!(
                min_eigenvalue = repaired.min_eigenvalue,
                floor = self.config.eigenvalue_floor(),
                "Correlation matrix regularised"
            );
        }
        let cholesky = repaired
            .matrix
            .cholesky()
            .map_err(SimulationFailure::Decomposition)?;

        let seed = self.config.seed().unwrap_or_else(random_seed);

        let pool = match &self.pool {
            Some(pool) => pool.clone(),
            None => WorkerPool::for_config(&self.config)?,
        };
        let worker_threads = pool.threads();

        let start = Instant::now();
        let batches = pool.install(|| self.run_batches(model, &cholesky, seed, token, start));

        let batches = match batches {
            Ok(batches) => batches,
            Err(e) => {
                if let AggregationError::SimulationCancelled(reason) = &e {
                    warn!(%reason, trials = runs, "Simulation cancelled");
                }
                return Err(e);
            }
        };

        let n = model.risk_count();
        let mut portfolio_losses = Vec::with_capacity(runs);
        let mut weighted_losses = Vec::with_capacity(runs * n);
        for batch in batches {
            portfolio_losses.extend(batch.portfolio);
            weighted_losses.extend(batch.weighted);
        }

        info!(
            trials = runs,
            risks = n,
            workers = worker_threads,
            regularised = repaired.was_regularized,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Simulation complete"
        );

        Ok(SimulationOutput {
            portfolio_losses,
            weighted_losses,
            risk_count: n,
            seed,
            was_regularized: repaired.was_regularized,
            min_eigenvalue: repaired.min_eigenvalue,
            worker_threads,
        })
    }

    fn run_batches(
        &self,
        model: &SimulationModel,
        cholesky: &CholeskyFactor,
        seed: u64,
        token: &CancellationToken,
        start: Instant,
    ) -> Result<Vec<BatchSamples>, AggregationError> {
        let runs = self.config.simulation_runs();
        let batch_size = self.config.batch_size();
        let budget = self.config.budget();
        let n_batches = runs.div_ceil(batch_size);

        (0..n_batches)
            .into_par_iter()
            .map(|b| {
                if token.is_cancelled() {
                    return Err(CancellationReason::Requested.into());
                }
                budget.check_elapsed(start.elapsed())?;

                let first = b * batch_size;
                let trials = first..(first + batch_size).min(runs);
                simulate_batch(model, cholesky, seed, trials).map_err(AggregationError::from)
            })
            .collect()
    }
}

/// Samples a contiguous range of trials.
fn simulate_batch(
    model: &SimulationModel,
    cholesky: &CholeskyFactor,
    seed: u64,
    trials: Range<usize>,
) -> Result<BatchSamples, SimulationFailure> {
    let n = model.risk_count();
    let mut z = vec![0.0; n];
    let mut x = vec![0.0; n];
    let mut portfolio = Vec::with_capacity(trials.len());
    let mut weighted = Vec::with_capacity(trials.len() * n);

    for trial in trials {
        let mut rng = TrialRng::for_trial(seed, trial as u64);
        rng.fill_normal(&mut z);
        cholesky.transform_into(&z, &mut x);

        let mut total = 0.0;
        for (risk, &xi) in model.risks().iter().zip(&x) {
            let loss = risk.weight * risk.distribution.inverse_cdf(norm_cdf(xi));
            if !loss.is_finite() {
                return Err(SimulationFailure::NonFiniteSample { trial });
            }
            weighted.push(loss);
            total += loss;
        }
        portfolio.push(total);
    }

    Ok(BatchSamples {
        portfolio,
        weighted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunBudget;
    use crate::loader::RiskInputLoader;
    use risk_core::portfolio::{CorrelationEdge, PortfolioBuilder, RiskItem};

    fn model() -> SimulationModel {
        let portfolio = PortfolioBuilder::new()
            .add_risk(RiskItem::new("A", 1.0, 0.0, 100.0, 400.0))
            .add_risk(RiskItem::new("B", 3.0, 50.0, 60.0, 70.0))
            .add_correlation(CorrelationEdge::new("A", "B", 0.5))
            .build();
        RiskInputLoader::new(0.1).load(&portfolio).unwrap()
    }

    fn config(runs: usize) -> SimulationConfig {
        SimulationConfig::builder()
            .simulation_runs(runs)
            .batch_size(64)
            .seed(42)
            .build()
            .unwrap()
    }

    #[test]
    fn test_output_shape() {
        let output = MonteCarloEngine::new(config(1_000))
            .run(&model(), &CancellationToken::new())
            .unwrap();

        assert_eq!(output.trials(), 1_000);
        assert_eq!(output.risk_count(), 2);
        assert_eq!(output.seed(), 42);
        assert_eq!(output.iter_trials().count(), 1_000);
        assert!(!output.was_regularized());
    }

    #[test]
    fn test_portfolio_loss_is_sum_of_weighted_losses() {
        let output = MonteCarloEngine::new(config(500))
            .run(&model(), &CancellationToken::new())
            .unwrap();

        for (t, total) in output.portfolio_losses().iter().enumerate() {
            let row: f64 = output.trial_losses(t).iter().sum();
            assert_eq!(*total, row);
        }
    }

    #[test]
    fn test_samples_within_weighted_bounds() {
        let output = MonteCarloEngine::new(config(2_000))
            .run(&model(), &CancellationToken::new())
            .unwrap();

        for loss in output.risk_losses(0) {
            assert!((0.0..=100.0).contains(&loss));
        }
        for loss in output.risk_losses(1) {
            assert!((37.5..=52.5).contains(&loss));
        }
    }

    #[test]
    fn test_same_seed_same_losses() {
        let engine = MonteCarloEngine::new(config(300));
        let a = engine.run(&model(), &CancellationToken::new()).unwrap();
        let b = engine.run(&model(), &CancellationToken::new()).unwrap();
        assert_eq!(a.portfolio_losses(), b.portfolio_losses());
    }

    #[test]
    fn test_batch_size_does_not_change_losses() {
        let small = MonteCarloEngine::new(config(777).to_builder().batch_size(5).build().unwrap())
            .run(&model(), &CancellationToken::new())
            .unwrap();
        let large = MonteCarloEngine::new(config(777).to_builder().batch_size(1_000).build().unwrap())
            .run(&model(), &CancellationToken::new())
            .unwrap();
        assert_eq!(small.portfolio_losses(), large.portfolio_losses());
    }

    #[test]
    fn test_dedicated_pool_matches_global_pool() {
        let pool = WorkerPool::dedicated(3).unwrap();
        let dedicated = MonteCarloEngine::new(config(900))
            .with_pool(pool.clone())
            .run(&model(), &CancellationToken::new())
            .unwrap();
        let global = MonteCarloEngine::new(config(900))
            .run(&model(), &CancellationToken::new())
            .unwrap();

        assert_eq!(dedicated.worker_threads(), 3);
        assert_eq!(pool.threads(), 3);
        assert_eq!(dedicated.portfolio_losses(), global.portfolio_losses());
    }

    #[test]
    fn test_worker_pool_identity() {
        let pool = WorkerPool::dedicated(2).unwrap();
        assert_eq!(pool, pool.clone());
        assert_ne!(pool, WorkerPool::dedicated(2).unwrap());
        assert_ne!(pool, WorkerPool::global());
        assert_eq!(WorkerPool::global(), WorkerPool::global());
    }

    #[test]
    fn test_trial_budget_rejected_upfront() {
        let config = config(1_000)
            .to_builder()
            .budget(RunBudget::unlimited().with_max_trials(999))
            .build()
            .unwrap();
        let err = MonteCarloEngine::new(config)
            .run(&model(), &CancellationToken::new())
            .unwrap_err();
        assert_eq!(
            err,
            AggregationError::SimulationCancelled(CancellationReason::TrialBudgetExceeded {
                requested: 1_000,
                budget: 999
            })
        );
    }

    #[test]
    fn test_cancelled_token() {
        let token = CancellationToken::new();
        token.cancel();
        let err = MonteCarloEngine::new(config(1_000))
            .run(&model(), &token)
            .unwrap_err();
        assert_eq!(
            err,
            AggregationError::SimulationCancelled(CancellationReason::Requested)
        );
    }

    #[test]
    fn test_token_clones_share_flag() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_random_seed_reported() {
        let config = SimulationConfig::builder()
            .simulation_runs(10)
            .build()
            .unwrap();
        let output = MonteCarloEngine::new(config)
            .run(&model(), &CancellationToken::new())
            .unwrap();
        let replay = SimulationConfig::builder()
            .simulation_runs(10)
            .seed(output.seed())
            .build()
            .unwrap();
        let again = MonteCarloEngine::new(replay)
            .run(&model(), &CancellationToken::new())
            .unwrap();
        assert_eq!(output.portfolio_losses(), again.portfolio_losses());
    }
}
