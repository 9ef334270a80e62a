//! Aggregation output records.
//!
//! Everything here is produced in one piece at the end of a run; there is no
//! partially populated report.

use chrono::{DateTime, Utc};
use risk_core::portfolio::SeverityBand;
use risk_core::types::RiskId;
use serde::{Deserialize, Serialize};

use crate::appetite::AppetiteAssessment;

/// Tolerance used when looking up a confidence level.
const LEVEL_TOLERANCE: f64 = 1e-12;

/// Tail risk measures at one confidence level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailMetric {
    /// Confidence level in (0, 1).
    pub confidence_level: f64,
    /// Nearest-rank portfolio VaR.
    pub value_at_risk: f64,
    /// Mean portfolio loss at or beyond the VaR.
    pub expected_shortfall: f64,
    /// Sum of each risk's own weighted VaR at this level.
    pub standalone_var_sum: f64,
    /// `standalone_var_sum / value_at_risk`; `None` when the VaR is zero.
    pub tail_diversification_ratio: Option<f64>,
}

/// Portfolio-level aggregation result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// Undiversified expected loss, Σ wᵢ·ALEᵢ.
    pub individual_ale_sum: f64,
    /// Mean simulated portfolio loss.
    pub diversified_ale: f64,
    /// `individual_ale_sum / diversified_ale`; `None` when the latter is zero.
    pub diversification_ratio: Option<f64>,
    /// Σ wᵢ² of the normalised weights.
    pub concentration_index: f64,
    /// `individual_ale_sum - diversified_ale`; may be negative.
    pub correlation_benefit: f64,
    /// One entry per requested confidence level, ascending.
    pub tail_metrics: Vec<TailMetric>,
    /// Number of trials.
    pub simulation_runs: usize,
    /// Largest percentage contribution of any single risk.
    pub largest_risk_contribution: f64,
    /// Completion timestamp.
    pub calculated_at: DateTime<Utc>,
    /// Wall-clock duration of the run.
    pub calculation_time_seconds: f64,
}

impl AggregationResult {
    /// Tail metrics at `level`, if it was requested.
    pub fn tail(&self, level: f64) -> Option<&TailMetric> {
        self.tail_metrics
            .iter()
            .find(|m| (m.confidence_level - level).abs() < LEVEL_TOLERANCE)
    }

    /// Portfolio VaR at `level`.
    pub fn var_at_confidence(&self, level: f64) -> Option<f64> {
        self.tail(level).map(|m| m.value_at_risk)
    }

    /// Portfolio expected shortfall at `level`.
    pub fn expected_shortfall(&self, level: f64) -> Option<f64> {
        self.tail(level).map(|m| m.expected_shortfall)
    }

    /// Tail metrics at the highest requested confidence level.
    pub fn headline_tail(&self) -> Option<&TailMetric> {
        self.tail_metrics.last()
    }
}

/// Attribution of portfolio risk to one risk item.
///
/// `component_contribution` is the Euler allocation and sums to the
/// diversified ALE across the portfolio. `marginal_contribution` is the
/// with/without difference and in general does not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskContribution {
    /// Risk identifier.
    pub risk_id: RiskId,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_title: Option<String>,
    /// Normalised weight.
    pub weight: f64,
    /// Mean of the risk's loss distribution.
    pub standalone_ale: f64,
    /// `weight * standalone_ale`.
    pub weighted_standalone_ale: f64,
    /// Diversified ALE minus the diversified ALE without this risk.
    pub marginal_contribution: f64,
    /// Euler allocation of the diversified ALE.
    pub component_contribution: f64,
    /// `component_contribution / portfolio_ale`, as a fraction.
    pub percentage_contribution: f64,
    /// Diversified ALE of the whole portfolio.
    pub portfolio_ale: f64,
    /// Severity band of the standalone ALE.
    pub severity_band: SeverityBand,
}

/// Run diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Seed actually used.
    pub seed: u64,
    /// Whether eigenvalue clipping was applied.
    pub correlation_matrix_was_regularized: bool,
    /// Smallest eigenvalue before any repair.
    pub min_eigenvalue_before_regularization: f64,
    /// Number of risks.
    pub risk_count: usize,
    /// Worker pool size.
    pub worker_threads: usize,
    /// Hex fingerprint of the request, for log correlation.
    pub input_fingerprint: String,
}

/// Complete output of an aggregation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReport {
    /// Portfolio name, if given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio_name: Option<String>,
    /// Portfolio metrics.
    pub result: AggregationResult,
    /// Per-risk contributions in portfolio order.
    pub contributions: Vec<RiskContribution>,
    /// Appetite classification.
    pub appetite: AppetiteAssessment,
    /// Run diagnostics.
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> AggregationResult {
        AggregationResult {
            individual_ale_sum: 100.0,
            diversified_ale: 100.0,
            diversification_ratio: Some(1.0),
            concentration_index: 0.5,
            correlation_benefit: 0.0,
            tail_metrics: vec![
                TailMetric {
                    confidence_level: 0.95,
                    value_at_risk: 150.0,
                    expected_shortfall: 170.0,
                    standalone_var_sum: 180.0,
                    tail_diversification_ratio: Some(1.2),
                },
                TailMetric {
                    confidence_level: 0.99,
                    value_at_risk: 190.0,
                    expected_shortfall: 200.0,
                    standalone_var_sum: 220.0,
                    tail_diversification_ratio: Some(220.0 / 190.0),
                },
            ],
            simulation_runs: 1_000,
            largest_risk_contribution: 0.6,
            calculated_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_default(),
            calculation_time_seconds: 0.1,
        }
    }

    #[test]
    fn test_lookup_by_level() {
        let r = result();
        assert_eq!(r.var_at_confidence(0.95), Some(150.0));
        assert_eq!(r.expected_shortfall(0.99), Some(200.0));
        assert_eq!(r.var_at_confidence(0.9), None);
        assert_eq!(r.headline_tail().map(|m| m.confidence_level), Some(0.99));
    }

    #[test]
    fn test_serialises_camel_case() {
        let json = serde_json::to_value(result()).unwrap();
        assert_eq!(json["individualAleSum"], 100.0);
        assert_eq!(json["tailMetrics"][0]["valueAtRisk"], 150.0);
        assert_eq!(json["tailMetrics"][1]["standaloneVarSum"], 220.0);
        assert_eq!(json["calculatedAt"], "1970-01-01T00:00:00Z");
    }
}
