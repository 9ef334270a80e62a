//! Risk Metrics Calculator.
//!
//! Reduces the retained samples to portfolio metrics. VaR uses the
//! nearest-rank method on the ascending sort, without interpolation:
//!
//! ```text
//! VaR_p = sorted[ceil(p·N) − 1]
//! ES_p  = mean(sorted[ceil(p·N) − 1 ..])
//! ```

use crate::loader::SimulationModel;
use crate::report::TailMetric;
use crate::simulation::SimulationOutput;

/// Absorbs representation error in `p·N` so that e.g. `0.95 × 1000` ranks
/// as 950.
const RANK_EPSILON: f64 = 1e-9;

/// Zero-based index of the nearest-rank quantile `p` in `n` sorted samples.
///
/// # Examples
///
/// ```rust
/// use risk_engine::metrics::var_index;
///
/// assert_eq!(var_index(0.95, 100), 94);
/// assert_eq!(var_index(0.99, 10_000), 9_899);
/// assert_eq!(var_index(0.001, 10), 0);
/// ```
pub fn var_index(p: f64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let rank = (p * n as f64 - RANK_EPSILON).ceil();
    let rank = if rank < 1.0 { 1 } else { rank as usize };
    rank.min(n) - 1
}

/// Nearest-rank VaR of ascending `sorted` samples; 0 for no samples.
pub fn value_at_risk(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted[var_index(p, sorted.len())]
}

/// Mean of the ascending `sorted` samples from the VaR index to the end.
pub fn expected_shortfall(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let tail = &sorted[var_index(p, sorted.len())..];
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Arithmetic mean; 0 for no samples.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Portfolio-level metrics of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioMetrics {
    /// Σ wᵢ·ALEᵢ.
    pub individual_ale_sum: f64,
    /// Mean simulated portfolio loss.
    pub diversified_ale: f64,
    /// `individual_ale_sum / diversified_ale`.
    pub diversification_ratio: Option<f64>,
    /// Σ wᵢ².
    pub concentration_index: f64,
    /// `individual_ale_sum - diversified_ale`.
    pub correlation_benefit: f64,
    /// Tail metrics per confidence level.
    pub tail_metrics: Vec<TailMetric>,
}

/// Computes portfolio metrics from simulation output.
pub struct RiskMetricsCalculator;

impl RiskMetricsCalculator {
    /// Computes portfolio metrics at the given confidence levels.
    ///
    /// `confidence_levels` is expected to be validated and ascending.
    pub fn calculate(
        model: &SimulationModel,
        output: &SimulationOutput,
        confidence_levels: &[f64],
    ) -> PortfolioMetrics {
        let individual_ale_sum = model.individual_ale_sum();
        let diversified_ale = mean(output.portfolio_losses());
        let diversification_ratio =
            (diversified_ale != 0.0).then(|| individual_ale_sum / diversified_ale);

        let portfolio_sorted = sorted(output.portfolio_losses().to_vec());
        let risk_sorted: Vec<Vec<f64>> = (0..output.risk_count())
            .map(|i| sorted(output.risk_losses(i)))
            .collect();

        let tail_metrics = confidence_levels
            .iter()
            .map(|&p| {
                let var = value_at_risk(&portfolio_sorted, p);
                let standalone_var_sum: f64 =
                    risk_sorted.iter().map(|s| value_at_risk(s, p)).sum();
                TailMetric {
                    confidence_level: p,
                    value_at_risk: var,
                    expected_shortfall: expected_shortfall(&portfolio_sorted, p),
                    standalone_var_sum,
                    tail_diversification_ratio: (var != 0.0).then(|| standalone_var_sum / var),
                }
            })
            .collect();

        PortfolioMetrics {
            individual_ale_sum,
            diversified_ale,
            diversification_ratio,
            concentration_index: model.concentration_index(),
            correlation_benefit: individual_ale_sum - diversified_ale,
            tail_metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_var_index_bounds() {
        assert_eq!(var_index(0.5, 1), 0);
        assert_eq!(var_index(0.999_999, 10), 9);
        assert_eq!(var_index(1e-12, 10), 0);
        assert_eq!(var_index(0.95, 1_000), 949);
        assert_eq!(var_index(0.95, 20), 18);
    }

    #[test]
    fn test_value_at_risk_nearest_rank() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(value_at_risk(&samples, 0.95), 95.0);
        assert_eq!(value_at_risk(&samples, 0.99), 99.0);
        assert_eq!(value_at_risk(&samples, 0.951), 96.0);
    }

    #[test]
    fn test_expected_shortfall_tail_mean() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        // mean of 95..=100
        assert_relative_eq!(expected_shortfall(&samples, 0.95), 97.5);
        assert_eq!(expected_shortfall(&samples, 0.999), 100.0);
    }

    #[test]
    fn test_single_sample() {
        assert_eq!(value_at_risk(&[7.0], 0.99), 7.0);
        assert_eq!(expected_shortfall(&[7.0], 0.01), 7.0);
    }

    #[test]
    fn test_empty_samples() {
        assert_eq!(value_at_risk(&[], 0.95), 0.0);
        assert_eq!(expected_shortfall(&[], 0.95), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_es_not_below_var() {
        let samples = [0.0, 0.0, 1.0, 3.0, 3.0, 8.0, 13.0, 13.0, 40.0, 41.0];
        for p in [0.1, 0.5, 0.75, 0.9, 0.95] {
            assert!(expected_shortfall(&samples, p) >= value_at_risk(&samples, p));
        }
    }
}
