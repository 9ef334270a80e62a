//! Contribution Decomposer.
//!
//! Attributes the diversified ALE back to individual risks in two ways.
//!
//! **Component (Euler) contribution.** Each trial with a positive portfolio
//! loss `Lₜ` contributes the share `wᵢLᵢₜ / Lₜ` to risk `i`. Shares are
//! averaged over those trials and renormalised, so that
//!
//! ```text
//! Σᵢ componentᵢ = diversified ALE
//! ```
//!
//! **Marginal contribution.** The diversified ALE minus the diversified ALE
//! of the portfolio without risk `i`, the remaining weights renormalised.
//! It is evaluated on the retained draws (common random numbers):
//!
//! ```text
//! D₋ᵢ = (D − mean(wᵢLᵢ)) / (1 − wᵢ)
//! ```
//!
//! Marginals do not in general sum to the diversified ALE and must not be
//! presented as an allocation.

use risk_core::portfolio::SeverityBand;

use crate::loader::SimulationModel;
use crate::metrics::mean;
use crate::report::RiskContribution;
use crate::simulation::SimulationOutput;

/// Splits portfolio risk into per-risk contributions.
pub struct ContributionDecomposer;

impl ContributionDecomposer {
    /// Decomposes `diversified_ale` over the risks of `model`, in portfolio
    /// order.
    pub fn decompose(
        model: &SimulationModel,
        output: &SimulationOutput,
        diversified_ale: f64,
    ) -> Vec<RiskContribution> {
        let components = Self::component_contributions(output, diversified_ale);

        model
            .risks()
            .iter()
            .zip(components)
            .enumerate()
            .map(|(i, (risk, component))| {
                let standalone_ale = risk.standalone_ale();
                let without = Self::ale_without(diversified_ale, risk.weight, &output.risk_losses(i));
                let percentage = if diversified_ale == 0.0 {
                    0.0
                } else {
                    component / diversified_ale
                };

                RiskContribution {
                    risk_id: risk.risk_id.clone(),
                    risk_title: risk.risk_title.clone(),
                    weight: risk.weight,
                    standalone_ale,
                    weighted_standalone_ale: risk.weighted_ale(),
                    marginal_contribution: diversified_ale - without,
                    component_contribution: component,
                    percentage_contribution: percentage,
                    portfolio_ale: diversified_ale,
                    severity_band: SeverityBand::from_ale(standalone_ale),
                }
            })
            .collect()
    }

    /// Euler components, renormalised to sum to `diversified_ale`.
    ///
    /// All zeros when `diversified_ale` is zero or no trial has a positive
    /// loss.
    pub fn component_contributions(output: &SimulationOutput, diversified_ale: f64) -> Vec<f64> {
        let n = output.risk_count();
        let mut shares = vec![0.0; n];
        if diversified_ale == 0.0 {
            return shares;
        }

        for (row, &total) in output.iter_trials().zip(output.portfolio_losses()) {
            if total <= 0.0 {
                continue;
            }
            for (share, &loss) in shares.iter_mut().zip(row) {
                *share += loss / total;
            }
        }

        let share_sum: f64 = shares.iter().sum();
        if share_sum <= 0.0 {
            return vec![0.0; n];
        }
        shares
            .into_iter()
            .map(|s| diversified_ale * s / share_sum)
            .collect()
    }

    /// Diversified ALE of the portfolio with this risk removed.
    fn ale_without(diversified_ale: f64, weight: f64, weighted_losses: &[f64]) -> f64 {
        let remaining = 1.0 - weight;
        if remaining.abs() < f64::EPSILON {
            return 0.0;
        }
        (diversified_ale - mean(weighted_losses)) / remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::loader::RiskInputLoader;
    use crate::simulation::{CancellationToken, MonteCarloEngine};
    use approx::assert_relative_eq;
    use risk_core::portfolio::{Portfolio, PortfolioBuilder, RiskItem};

    fn run(portfolio: &Portfolio) -> (SimulationModel, SimulationOutput, f64) {
        let model = RiskInputLoader::new(0.1).load(portfolio).unwrap();
        let config = SimulationConfig::builder()
            .simulation_runs(2_000)
            .seed(11)
            .build()
            .unwrap();
        let output = MonteCarloEngine::new(config)
            .run(&model, &CancellationToken::new())
            .unwrap();
        let d = mean(output.portfolio_losses());
        (model, output, d)
    }

    #[test]
    fn test_components_sum_to_diversified_ale() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(RiskItem::new("A", 1.0, 0.0, 1_000.0, 5_000.0))
            .add_risk(RiskItem::new("B", 2.0, 200.0, 300.0, 900.0))
            .add_risk(RiskItem::new("C", 0.5, 10_000.0, 20_000.0, 90_000.0))
            .build();
        let (model, output, d) = run(&portfolio);
        let contributions = ContributionDecomposer::decompose(&model, &output, d);

        let total: f64 = contributions.iter().map(|c| c.component_contribution).sum();
        assert_relative_eq!(total, d, max_relative = 1e-9);

        let pct: f64 = contributions.iter().map(|c| c.percentage_contribution).sum();
        assert_relative_eq!(pct, 1.0, max_relative = 1e-9);
        assert!(contributions.iter().all(|c| c.portfolio_ale == d));
    }

    #[test]
    fn test_single_risk_takes_everything() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(RiskItem::new("A", 3.0, 10.0, 20.0, 30.0))
            .build();
        let (model, output, d) = run(&portfolio);
        let contributions = ContributionDecomposer::decompose(&model, &output, d);

        assert_eq!(contributions.len(), 1);
        assert_relative_eq!(contributions[0].component_contribution, d, max_relative = 1e-12);
        // Removing the only risk leaves nothing.
        assert_relative_eq!(contributions[0].marginal_contribution, d);
    }

    #[test]
    fn test_zero_loss_portfolio() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(RiskItem::new("A", 1.0, 0.0, 0.0, 0.0))
            .add_risk(RiskItem::new("B", 1.0, 0.0, 0.0, 0.0))
            .build();
        let (model, output, d) = run(&portfolio);
        assert_eq!(d, 0.0);

        let contributions = ContributionDecomposer::decompose(&model, &output, d);
        for c in &contributions {
            assert_eq!(c.component_contribution, 0.0);
            assert_eq!(c.percentage_contribution, 0.0);
        }
    }

    #[test]
    fn test_marginal_matches_reduced_portfolio_mean() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(RiskItem::new("A", 1.0, 0.0, 100.0, 200.0))
            .add_risk(RiskItem::new("B", 1.0, 1_000.0, 1_000.0, 1_000.0))
            .build();
        let (model, output, d) = run(&portfolio);
        let contributions = ContributionDecomposer::decompose(&model, &output, d);

        // Without A the portfolio is B alone at full weight: ALE 1000.
        assert_relative_eq!(contributions[0].marginal_contribution, d - 1_000.0, epsilon = 1e-9);
        assert_eq!(contributions[1].severity_band, SeverityBand::Low);
        assert_eq!(contributions[1].weighted_standalone_ale, 500.0);
    }

    #[test]
    fn test_zero_weight_risk_contributes_nothing() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(RiskItem::new("A", 1.0, 0.0, 100.0, 200.0))
            .add_risk(RiskItem::new("Z", 0.0, 0.0, 100.0, 200.0))
            .build();
        let (model, output, d) = run(&portfolio);
        let contributions = ContributionDecomposer::decompose(&model, &output, d);

        assert_eq!(contributions[1].component_contribution, 0.0);
        assert_relative_eq!(contributions[1].marginal_contribution, 0.0, epsilon = 1e-9);
    }
}
