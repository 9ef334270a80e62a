//! Pairwise correlation edges between risks.

use serde::{Deserialize, Serialize};

use crate::types::RiskId;

/// Pairwise correlation between two risk items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationEdge {
    /// First endpoint.
    pub risk_id_a: RiskId,
    /// Second endpoint.
    pub risk_id_b: RiskId,
    /// Correlation coefficient in [-1, 1].
    pub coefficient: f64,
    /// How the coefficient was obtained (e.g. "historical", "expert").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_type: Option<String>,
    /// Analyst confidence in the coefficient, in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,
}

impl CorrelationEdge {
    /// Creates an edge without metadata.
    pub fn new(risk_id_a: impl Into<RiskId>, risk_id_b: impl Into<RiskId>, coefficient: f64) -> Self {
        Self {
            risk_id_a: risk_id_a.into(),
            risk_id_b: risk_id_b.into(),
            coefficient,
            correlation_type: None,
            confidence_level: None,
        }
    }

    /// Sets the correlation type label.
    pub fn with_type(mut self, correlation_type: impl Into<String>) -> Self {
        self.correlation_type = Some(correlation_type.into());
        self
    }

    /// Sets the analyst confidence level.
    pub fn with_confidence(mut self, confidence_level: f64) -> Self {
        self.confidence_level = Some(confidence_level);
        self
    }

    /// Returns the endpoints as an unordered pair key.
    pub fn pair_key(&self) -> (&RiskId, &RiskId) {
        if self.risk_id_a <= self.risk_id_b {
            (&self.risk_id_a, &self.risk_id_b)
        } else {
            (&self.risk_id_b, &self.risk_id_a)
        }
    }
}
