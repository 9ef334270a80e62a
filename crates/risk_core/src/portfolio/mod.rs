//! Portfolio input records.
//!
//! A [`Portfolio`] is the aggregation unit: an ordered list of
//! [`RiskItem`]s plus [`CorrelationEdge`]s and optional appetite thresholds.
//! Records here are plain data; validation belongs to the engine's loader so
//! that every check runs before any simulation work starts.

mod edge;
mod item;
mod loss;
mod severity;

pub use edge::CorrelationEdge;
pub use item::RiskItem;
pub use loss::{FairFactors, ThreePointEstimate};
pub use severity::SeverityBand;

use serde::{Deserialize, Serialize};

/// Collection of risks and their pairwise correlations.
///
/// Item order does not affect the mathematics; it fixes the order of the
/// per-risk output records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Loss level the organisation is willing to accept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_appetite: Option<f64>,
    /// Maximum acceptable loss level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_tolerance: Option<f64>,
    /// Risks in output order.
    #[serde(default)]
    pub risk_items: Vec<RiskItem>,
    /// Pairwise correlations.
    #[serde(default)]
    pub correlations: Vec<CorrelationEdge>,
}

impl Portfolio {
    /// Returns the number of risk items.
    #[inline]
    pub fn risk_count(&self) -> usize {
        self.risk_items.len()
    }

    /// Returns the number of correlation edges.
    #[inline]
    pub fn correlation_count(&self) -> usize {
        self.correlations.len()
    }

    /// Returns `true` if the portfolio has no risk items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.risk_items.is_empty()
    }
}

/// Fluent builder for [`Portfolio`].
#[derive(Default)]
pub struct PortfolioBuilder {
    portfolio: Portfolio,
}

impl PortfolioBuilder {
    /// Creates an empty builder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.portfolio.name = Some(name.into());
        self
    }

    /// Sets the risk appetite threshold.
    pub fn risk_appetite(mut self, appetite: f64) -> Self {
        self.portfolio.risk_appetite = Some(appetite);
        self
    }

    /// Sets the risk tolerance threshold.
    pub fn risk_tolerance(mut self, tolerance: f64) -> Self {
        self.portfolio.risk_tolerance = Some(tolerance);
        self
    }

    /// Adds a risk item.
    pub fn add_risk(mut self, risk: RiskItem) -> Self {
        self.portfolio.risk_items.push(risk);
        self
    }

    /// Adds multiple risk items.
    pub fn add_risks(mut self, risks: impl IntoIterator<Item = RiskItem>) -> Self {
        self.portfolio.risk_items.extend(risks);
        self
    }

    /// Adds a correlation edge.
    pub fn add_correlation(mut self, edge: CorrelationEdge) -> Self {
        self.portfolio.correlations.push(edge);
        self
    }

    /// Adds multiple correlation edges.
    pub fn add_correlations(mut self, edges: impl IntoIterator<Item = CorrelationEdge>) -> Self {
        self.portfolio.correlations.extend(edges);
        self
    }

    /// Returns the assembled portfolio.
    pub fn build(self) -> Portfolio {
        self.portfolio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_order() {
        let portfolio = PortfolioBuilder::new()
            .add_risk(RiskItem::new("B", 1.0, 1.0, 2.0, 3.0))
            .add_risk(RiskItem::new("A", 1.0, 1.0, 2.0, 3.0))
            .build();

        let ids: Vec<&str> = portfolio
            .risk_items
            .iter()
            .map(|r| r.risk_id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_builder_thresholds() {
        let portfolio = PortfolioBuilder::new()
            .name("Core banking")
            .risk_appetite(1_000.0)
            .risk_tolerance(5_000.0)
            .build();

        assert_eq!(portfolio.name.as_deref(), Some("Core banking"));
        assert_eq!(portfolio.risk_appetite, Some(1_000.0));
        assert_eq!(portfolio.risk_tolerance, Some(5_000.0));
        assert!(portfolio.is_empty());
    }

    #[test]
    fn test_deserialise_minimal_portfolio() {
        let json = r#"{
            "riskItems": [
                { "riskId": "R1", "weight": 1, "lossMin": 0, "lossMostLikely": 1, "lossMax": 2 }
            ]
        }"#;
        let portfolio: Portfolio = serde_json::from_str(json).unwrap();
        assert_eq!(portfolio.risk_count(), 1);
        assert_eq!(portfolio.correlation_count(), 0);
    }
}
