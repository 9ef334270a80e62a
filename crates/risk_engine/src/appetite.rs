//! Risk appetite assessment.
//!
//! Classifies the headline VaR (highest requested confidence level) against
//! the portfolio's appetite and tolerance thresholds.

use serde::{Deserialize, Serialize};

/// Position of the headline VaR relative to the thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppetiteStatus {
    /// VaR ≤ appetite.
    WithinAppetite,
    /// Appetite < VaR ≤ tolerance.
    AboveAppetite,
    /// VaR > tolerance.
    AboveTolerance,
    /// No threshold was supplied.
    NotAssessed,
}

impl AppetiteStatus {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            AppetiteStatus::WithinAppetite => "Within appetite",
            AppetiteStatus::AboveAppetite => "Above appetite",
            AppetiteStatus::AboveTolerance => "Above tolerance",
            AppetiteStatus::NotAssessed => "Not assessed",
        }
    }
}

/// Appetite classification with headroom to each threshold.
///
/// Headroom is `threshold - VaR`; negative values mean the threshold is
/// breached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppetiteAssessment {
    /// Classification.
    pub status: AppetiteStatus,
    /// Confidence level of the VaR that was assessed.
    pub confidence_level: f64,
    /// VaR that was assessed.
    pub value_at_risk: f64,
    /// Appetite threshold.
    pub risk_appetite: Option<f64>,
    /// Tolerance threshold.
    pub risk_tolerance: Option<f64>,
    /// `risk_appetite - value_at_risk`.
    pub appetite_headroom: Option<f64>,
    /// `risk_tolerance - value_at_risk`.
    pub tolerance_headroom: Option<f64>,
}

impl AppetiteAssessment {
    /// Classifies `value_at_risk`.
    ///
    /// With only a tolerance, a VaR within it counts as within appetite.
    /// With only an appetite, any breach counts as above appetite.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use risk_engine::appetite::{AppetiteAssessment, AppetiteStatus};
    ///
    /// let a = AppetiteAssessment::assess(0.99, 750.0, Some(500.0), Some(1_000.0));
    /// assert_eq!(a.status, AppetiteStatus::AboveAppetite);
    /// assert_eq!(a.appetite_headroom, Some(-250.0));
    /// assert_eq!(a.tolerance_headroom, Some(250.0));
    /// ```
    pub fn assess(
        confidence_level: f64,
        value_at_risk: f64,
        risk_appetite: Option<f64>,
        risk_tolerance: Option<f64>,
    ) -> Self {
        let status = match (risk_appetite, risk_tolerance) {
            (None, None) => AppetiteStatus::NotAssessed,
            (_, Some(t)) if value_at_risk > t => AppetiteStatus::AboveTolerance,
            (Some(a), _) if value_at_risk > a => AppetiteStatus::AboveAppetite,
            _ => AppetiteStatus::WithinAppetite,
        };

        Self {
            status,
            confidence_level,
            value_at_risk,
            risk_appetite,
            risk_tolerance,
            appetite_headroom: risk_appetite.map(|a| a - value_at_risk),
            tolerance_headroom: risk_tolerance.map(|t| t - value_at_risk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_assessed_without_thresholds() {
        let a = AppetiteAssessment::assess(0.99, 1_000.0, None, None);
        assert_eq!(a.status, AppetiteStatus::NotAssessed);
        assert_eq!(a.appetite_headroom, None);
    }

    #[test]
    fn test_classification_boundaries() {
        let assess = |var| AppetiteAssessment::assess(0.95, var, Some(100.0), Some(200.0)).status;
        assert_eq!(assess(50.0), AppetiteStatus::WithinAppetite);
        assert_eq!(assess(100.0), AppetiteStatus::WithinAppetite);
        assert_eq!(assess(150.0), AppetiteStatus::AboveAppetite);
        assert_eq!(assess(200.0), AppetiteStatus::AboveAppetite);
        assert_eq!(assess(200.01), AppetiteStatus::AboveTolerance);
    }

    #[test]
    fn test_single_threshold() {
        let appetite_only = AppetiteAssessment::assess(0.95, 5_000.0, Some(1_000.0), None);
        assert_eq!(appetite_only.status, AppetiteStatus::AboveAppetite);

        let tolerance_only = AppetiteAssessment::assess(0.95, 500.0, None, Some(1_000.0));
        assert_eq!(tolerance_only.status, AppetiteStatus::WithinAppetite);
        assert_eq!(tolerance_only.tolerance_headroom, Some(500.0));
    }

    #[test]
    fn test_status_names() {
        assert_eq!(AppetiteStatus::AboveTolerance.name(), "Above tolerance");
        assert_eq!(AppetiteStatus::NotAssessed.name(), "Not assessed");
    }
}
