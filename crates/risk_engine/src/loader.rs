//! Risk Input Loader.
//!
//! Validates a [`Portfolio`] and turns it into a [`SimulationModel`]: fitted
//! triangular distributions, normalised weights and a dense correlation
//! matrix. Every check runs here so that a bad input never starts a
//! simulation.

use std::collections::{HashMap, HashSet};

use risk_core::math::{CorrelationMatrix, Triangular};
use risk_core::portfolio::Portfolio;
use risk_core::types::{
    AggregationError, CorrelationError, PortfolioError, RiskId, SimulationFailure,
};

/// A validated risk ready for sampling.
#[derive(Clone, Debug)]
pub struct LoadedRisk {
    /// Identifier.
    pub risk_id: RiskId,
    /// Display title.
    pub risk_title: Option<String>,
    /// Normalised weight.
    pub weight: f64,
    /// Fitted annual loss distribution.
    pub distribution: Triangular,
}

impl LoadedRisk {
    /// Standalone ALE, the mean of the loss distribution.
    #[inline]
    pub fn standalone_ale(&self) -> f64 {
        self.distribution.mean()
    }

    /// Weighted standalone ALE.
    #[inline]
    pub fn weighted_ale(&self) -> f64 {
        self.weight * self.standalone_ale()
    }
}

/// Validated, immutable input to the simulation engine.
#[derive(Clone, Debug)]
pub struct SimulationModel {
    risks: Vec<LoadedRisk>,
    correlation: CorrelationMatrix,
    risk_appetite: Option<f64>,
    risk_tolerance: Option<f64>,
}

impl SimulationModel {
    /// Risks in portfolio order.
    #[inline]
    pub fn risks(&self) -> &[LoadedRisk] {
        &self.risks
    }

    /// Number of risks.
    #[inline]
    pub fn risk_count(&self) -> usize {
        self.risks.len()
    }

    /// Dense correlation matrix in portfolio order.
    #[inline]
    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    /// Risk appetite threshold.
    #[inline]
    pub fn risk_appetite(&self) -> Option<f64> {
        self.risk_appetite
    }

    /// Risk tolerance threshold.
    #[inline]
    pub fn risk_tolerance(&self) -> Option<f64> {
        self.risk_tolerance
    }

    /// Normalised weights in portfolio order.
    pub fn weights(&self) -> Vec<f64> {
        self.risks.iter().map(|r| r.weight).collect()
    }

    /// Undiversified expected loss, Σ wᵢ·ALEᵢ.
    pub fn individual_ale_sum(&self) -> f64 {
        self.risks.iter().map(LoadedRisk::weighted_ale).sum()
    }

    /// Herfindahl index of the normalised weights, Σ wᵢ².
    pub fn concentration_index(&self) -> f64 {
        self.risks.iter().map(|r| r.weight * r.weight).sum()
    }
}

/// Validates portfolios and builds simulation models.
#[derive(Clone, Copy, Debug)]
pub struct RiskInputLoader {
    default_group_correlation: f64,
}

impl RiskInputLoader {
    /// Creates a loader that applies `default_group_correlation` to risks
    /// sharing a correlation group without an explicit edge.
    pub fn new(default_group_correlation: f64) -> Self {
        Self {
            default_group_correlation,
        }
    }

    /// Validates `portfolio` and builds its simulation model.
    ///
    /// # Errors
    ///
    /// - `InvalidPortfolio` for an empty risk set, duplicate IDs, bad
    ///   weights, malformed loss bounds or bad appetite thresholds
    /// - `InvalidCorrelation` for self, unknown, out-of-range or duplicate
    ///   edges
    pub fn load(&self, portfolio: &Portfolio) -> Result<SimulationModel, AggregationError> {
        if portfolio.is_empty() {
            return Err(PortfolioError::EmptyPortfolio.into());
        }

        let (risk_appetite, risk_tolerance) = validate_thresholds(portfolio)?;

        let mut seen = HashSet::with_capacity(portfolio.risk_count());
        let mut risks = Vec::with_capacity(portfolio.risk_count());

        for item in &portfolio.risk_items {
            if !seen.insert(&item.risk_id) {
                return Err(PortfolioError::DuplicateRisk(item.risk_id.to_string()).into());
            }
            if !item.weight.is_finite() || item.weight < 0.0 {
                return Err(PortfolioError::InvalidWeight {
                    risk_id: item.risk_id.to_string(),
                    weight: item.weight,
                }
                .into());
            }

            let malformed = |reason: String| PortfolioError::MalformedDistribution {
                risk_id: item.risk_id.to_string(),
                reason,
            };
            let estimate = item.loss_estimate()?;
            estimate.validate("loss").map_err(malformed)?;
            let distribution =
                Triangular::new(estimate.min, estimate.most_likely, estimate.max)
                    .map_err(|e| malformed(e.to_string()))?;

            risks.push(LoadedRisk {
                risk_id: item.risk_id.clone(),
                risk_title: item.risk_title.clone(),
                weight: item.weight,
                distribution,
            });
        }

        // Scale by the largest weight first so the sum cannot overflow.
        let max_weight = risks.iter().map(|r| r.weight).fold(0.0, f64::max);
        if max_weight <= 0.0 {
            return Err(PortfolioError::ZeroWeightSum.into());
        }
        let scaled_sum: f64 = risks.iter().map(|r| r.weight / max_weight).sum();
        for risk in &mut risks {
            risk.weight = risk.weight / max_weight / scaled_sum;
        }

        let correlation = self.build_correlation(portfolio)?;

        Ok(SimulationModel {
            risks,
            correlation,
            risk_appetite,
            risk_tolerance,
        })
    }

    fn build_correlation(&self, portfolio: &Portfolio) -> Result<CorrelationMatrix, AggregationError> {
        let n = portfolio.risk_count();
        let index: HashMap<&RiskId, usize> = portfolio
            .risk_items
            .iter()
            .enumerate()
            .map(|(i, item)| (&item.risk_id, i))
            .collect();

        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }

        // Same-group fallback; explicit edges below take precedence.
        for (i, a) in portfolio.risk_items.iter().enumerate() {
            let Some(group_a) = a.correlation_group.as_deref() else {
                continue;
            };
            for (j, b) in portfolio.risk_items.iter().enumerate().skip(i + 1) {
                if b.correlation_group.as_deref() == Some(group_a) {
                    data[i * n + j] = self.default_group_correlation;
                    data[j * n + i] = self.default_group_correlation;
                }
            }
        }

        let mut pairs = HashSet::with_capacity(portfolio.correlation_count());
        for edge in &portfolio.correlations {
            let risk_a = edge.risk_id_a.to_string();
            let risk_b = edge.risk_id_b.to_string();

            if edge.risk_id_a == edge.risk_id_b {
                return Err(CorrelationError::SelfCorrelation(risk_a).into());
            }
            let unknown = |missing: &RiskId| CorrelationError::UnknownRisk {
                risk_a: risk_a.clone(),
                risk_b: risk_b.clone(),
                missing: missing.to_string(),
            };
            let i = *index
                .get(&edge.risk_id_a)
                .ok_or_else(|| unknown(&edge.risk_id_a))?;
            let j = *index
                .get(&edge.risk_id_b)
                .ok_or_else(|| unknown(&edge.risk_id_b))?;

            let rho = edge.coefficient;
            if !rho.is_finite() || !(-1.0..=1.0).contains(&rho) {
                return Err(CorrelationError::OutOfRange {
                    risk_a,
                    risk_b,
                    value: rho,
                }
                .into());
            }
            if let Some(level) = edge.confidence_level {
                if !level.is_finite() || !(0.0..=1.0).contains(&level) {
                    return Err(CorrelationError::InvalidConfidence {
                        risk_a,
                        risk_b,
                        value: level,
                    }
                    .into());
                }
            }
            if !pairs.insert(edge.pair_key()) {
                return Err(CorrelationError::DuplicateEdge { risk_a, risk_b }.into());
            }

            data[i * n + j] = rho;
            data[j * n + i] = rho;
        }

        CorrelationMatrix::new(&data, n)
            .map_err(|e| AggregationError::from(SimulationFailure::Decomposition(e)))
    }
}

fn validate_thresholds(
    portfolio: &Portfolio,
) -> Result<(Option<f64>, Option<f64>), PortfolioError> {
    let check = |label: &str, value: Option<f64>| match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(PortfolioError::InvalidThreshold(format!(
            "{} {} must be a non-negative number",
            label, v
        ))),
        _ => Ok(value),
    };
    let appetite = check("riskAppetite", portfolio.risk_appetite)?;
    let tolerance = check("riskTolerance", portfolio.risk_tolerance)?;

    if let (Some(a), Some(t)) = (appetite, tolerance) {
        if a > t {
            return Err(PortfolioError::InvalidThreshold(format!(
                "riskAppetite {} exceeds riskTolerance {}",
                a, t
            )));
        }
    }
    Ok((appetite, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use risk_core::portfolio::{CorrelationEdge, PortfolioBuilder, RiskItem};

    fn loader() -> RiskInputLoader {
        RiskInputLoader::new(0.1)
    }

    fn risk(id: &str, weight: f64) -> RiskItem {
        RiskItem::new(id, weight, 100.0, 200.0, 600.0)
    }

    fn expect_portfolio_error(portfolio: &Portfolio) -> PortfolioError {
        match loader().load(portfolio) {
            Err(AggregationError::InvalidPortfolio(e)) => e,
            other => panic!("expected InvalidPortfolio, got {:?}", other),
        }
    }

    fn expect_correlation_error(portfolio: &Portfolio) -> CorrelationError {
        match loader().load(portfolio) {
            Err(AggregationError::InvalidCorrelation(e)) => e,
            other => panic!("expected InvalidCorrelation, got {:?}", other),
        }
    }

    #[test]
    fn test_weights_normalised() {
        let portfolio = PortfolioBuilder::new()
            .add_risks([risk("A", 2.0), risk("B", 2.0), risk("C", 4.0)])
            .build();
        let model = loader().load(&portfolio).unwrap();

        assert_eq!(model.weights(), vec![0.25, 0.25, 0.5]);
        assert_relative_eq!(model.concentration_index(), 0.375);
        assert_relative_eq!(model.individual_ale_sum(), 300.0);
    }

    #[test]
    fn test_huge_weights_normalised() {
        let portfolio = PortfolioBuilder::new()
            .add_risks([risk("A", 1e308), risk("B", 1e308)])
            .build();
        let model = loader().load(&portfolio).unwrap();

        assert_eq!(model.weights(), vec![0.5, 0.5]);
        assert_relative_eq!(model.individual_ale_sum(), 300.0);
    }

    #[test]
    fn test_tiny_weights_normalised() {
        let portfolio = PortfolioBuilder::new()
            .add_risks([risk("A", 1e-310), risk("B", 3e-310)])
            .build();
        let model = loader().load(&portfolio).unwrap();

        let weights = model.weights();
        assert_relative_eq!(weights[0], 0.25, max_relative = 1e-9);
        assert_relative_eq!(weights[1], 0.75, max_relative = 1e-9);
    }

    #[test]
    fn test_empty_portfolio() {
        let err = expect_portfolio_error(&Portfolio::default());
        assert_eq!(err, PortfolioError::EmptyPortfolio);
    }

    #[test]
    fn test_duplicate_risk() {
        let portfolio = PortfolioBuilder::new()
            .add_risks([risk("A", 1.0), risk("A", 1.0)])
            .build();
        assert_eq!(
            expect_portfolio_error(&portfolio),
            PortfolioError::DuplicateRisk("A".to_string())
        );
    }

    #[test]
    fn test_negative_and_nan_weights() {
        for weight in [-1.0, f64::NAN, f64::INFINITY] {
            let portfolio = PortfolioBuilder::new().add_risk(risk("A", weight)).build();
            assert!(matches!(
                expect_portfolio_error(&portfolio),
                PortfolioError::InvalidWeight { .. }
            ));
        }
    }

    #[test]
    fn test_zero_weight_sum() {
        let portfolio = PortfolioBuilder::new()
            .add_risks([risk("A", 0.0), risk("B", 0.0)])
            .build();
        assert_eq!(
            expect_portfolio_error(&portfolio),
            PortfolioError::ZeroWeightSum
        );
    }

    #[test]
    fn test_malformed_distribution() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(RiskItem::new("A", 1.0, 500.0, 100.0, 900.0))
            .build();
        match expect_portfolio_error(&portfolio) {
            PortfolioError::MalformedDistribution { risk_id, reason } => {
                assert_eq!(risk_id, "A");
                assert!(reason.contains("exceeds most likely"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let negative = PortfolioBuilder::new()
            .add_risk(RiskItem::new("B", 1.0, -5.0, 0.0, 10.0))
            .build();
        assert!(matches!(
            expect_portfolio_error(&negative),
            PortfolioError::MalformedDistribution { .. }
        ));
    }

    #[test]
    fn test_threshold_validation() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(risk("A", 1.0))
            .risk_appetite(500.0)
            .risk_tolerance(100.0)
            .build();
        assert!(matches!(
            expect_portfolio_error(&portfolio),
            PortfolioError::InvalidThreshold(_)
        ));

        let negative = PortfolioBuilder::new()
            .add_risk(risk("A", 1.0))
            .risk_appetite(-1.0)
            .build();
        assert!(matches!(
            expect_portfolio_error(&negative),
            PortfolioError::InvalidThreshold(_)
        ));
    }

    #[test]
    fn test_self_correlation() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(risk("A", 1.0))
            .add_correlation(CorrelationEdge::new("A", "A", 0.5))
            .build();
        assert_eq!(
            expect_correlation_error(&portfolio),
            CorrelationError::SelfCorrelation("A".to_string())
        );
    }

    #[test]
    fn test_unknown_risk_in_edge() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(risk("A", 1.0))
            .add_correlation(CorrelationEdge::new("A", "Z", 0.5))
            .build();
        match expect_correlation_error(&portfolio) {
            CorrelationError::UnknownRisk { missing, .. } => assert_eq!(missing, "Z"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_coefficient() {
        for rho in [1.5, -1.01, f64::NAN] {
            let portfolio = PortfolioBuilder::new()
                .add_risks([risk("A", 1.0), risk("B", 1.0)])
                .add_correlation(CorrelationEdge::new("A", "B", rho))
                .build();
            assert!(matches!(
                expect_correlation_error(&portfolio),
                CorrelationError::OutOfRange { .. }
            ));
        }
    }

    #[test]
    fn test_invalid_confidence_metadata() {
        let portfolio = PortfolioBuilder::new()
            .add_risks([risk("A", 1.0), risk("B", 1.0)])
            .add_correlation(CorrelationEdge::new("A", "B", 0.3).with_confidence(1.5))
            .build();
        assert!(matches!(
            expect_correlation_error(&portfolio),
            CorrelationError::InvalidConfidence { .. }
        ));
    }

    #[test]
    fn test_duplicate_edge_either_direction() {
        let portfolio = PortfolioBuilder::new()
            .add_risks([risk("A", 1.0), risk("B", 1.0)])
            .add_correlation(CorrelationEdge::new("A", "B", 0.3))
            .add_correlation(CorrelationEdge::new("B", "A", 0.4))
            .build();
        assert_eq!(
            expect_correlation_error(&portfolio),
            CorrelationError::DuplicateEdge {
                risk_a: "B".to_string(),
                risk_b: "A".to_string()
            }
        );
    }

    #[test]
    fn test_matrix_assembly() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(risk("A", 1.0).with_group("infra"))
            .add_risk(risk("B", 1.0).with_group("infra"))
            .add_risk(risk("C", 1.0).with_group("infra"))
            .add_risk(risk("D", 1.0))
            .add_correlation(CorrelationEdge::new("C", "A", 0.6))
            .add_correlation(CorrelationEdge::new("B", "D", -0.2))
            .build();
        let model = loader().load(&portfolio).unwrap();
        let m = model.correlation();

        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(0, 1), 0.1);
        assert_eq!(m.get(0, 2), 0.6);
        assert_eq!(m.get(2, 0), 0.6);
        assert_eq!(m.get(1, 3), -0.2);
        assert_eq!(m.get(0, 3), 0.0);
    }

    #[test]
    fn test_fair_factor_risk_loads() {
        use risk_core::portfolio::{FairFactors, ThreePointEstimate};

        let factors = FairFactors {
            loss_event_frequency: ThreePointEstimate::new(1.0, 2.0, 3.0),
            primary_loss: ThreePointEstimate::new(100.0, 100.0, 100.0),
            secondary_loss: None,
        };
        let portfolio = PortfolioBuilder::new()
            .add_risk(RiskItem::from_fair("F", 1.0, factors))
            .build();
        let model = loader().load(&portfolio).unwrap();
        assert_relative_eq!(model.risks()[0].standalone_ale(), 200.0);
    }
}
