//! Individual risk records.

use serde::{Deserialize, Serialize};

use super::loss::{FairFactors, ThreePointEstimate};
use crate::types::{PortfolioError, RiskId};

/// An individual quantitative risk to be aggregated.
///
/// The loss range is either given directly (`loss_min`, `loss_most_likely`,
/// `loss_max`) or derived from FAIR factors; exactly one of the two must be
/// present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskItem {
    /// Risk identifier, unique within the portfolio.
    pub risk_id: RiskId,
    /// Display title carried through to contributions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_title: Option<String>,
    /// Allocation within the portfolio, normalised by the loader.
    pub weight: f64,
    /// Minimum annual loss.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_min: Option<f64>,
    /// Most likely annual loss.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_most_likely: Option<f64>,
    /// Maximum annual loss.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_max: Option<f64>,
    /// FAIR factor estimates, alternative to direct bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fair_factors: Option<FairFactors>,
    /// Tag used to approximate intra-group correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_group: Option<String>,
}

impl RiskItem {
    /// Creates a risk with direct loss bounds.
    pub fn new(
        risk_id: impl Into<RiskId>,
        weight: f64,
        loss_min: f64,
        loss_most_likely: f64,
        loss_max: f64,
    ) -> Self {
        Self {
            risk_id: risk_id.into(),
            risk_title: None,
            weight,
            loss_min: Some(loss_min),
            loss_most_likely: Some(loss_most_likely),
            loss_max: Some(loss_max),
            fair_factors: None,
            correlation_group: None,
        }
    }

    /// Creates a risk whose loss range is derived from FAIR factors.
    pub fn from_fair(risk_id: impl Into<RiskId>, weight: f64, factors: FairFactors) -> Self {
        Self {
            risk_id: risk_id.into(),
            risk_title: None,
            weight,
            loss_min: None,
            loss_most_likely: None,
            loss_max: None,
            fair_factors: Some(factors),
            correlation_group: None,
        }
    }

    /// Sets the correlation group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.correlation_group = Some(group.into());
        self
    }

    /// Sets the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.risk_title = Some(title.into());
        self
    }

    /// Resolves the annual loss range from whichever source was supplied.
    ///
    /// Ordering of the returned bounds is checked here only for FAIR factors;
    /// direct bounds are checked when the triangular distribution is fitted.
    ///
    /// # Errors
    ///
    /// `PortfolioError::MalformedDistribution` if both or neither sources are
    /// present, direct bounds are partial, or a FAIR factor is malformed.
    pub fn loss_estimate(&self) -> Result<ThreePointEstimate, PortfolioError> {
        let malformed = |reason: String| PortfolioError::MalformedDistribution {
            risk_id: self.risk_id.to_string(),
            reason,
        };

        let direct = match (self.loss_min, self.loss_most_likely, self.loss_max) {
            (Some(min), Some(ml), Some(max)) => Some(ThreePointEstimate::new(min, ml, max)),
            (None, None, None) => None,
            _ => {
                return Err(malformed(
                    "lossMin, lossMostLikely and lossMax must be supplied together".to_string(),
                ))
            }
        };

        match (direct, &self.fair_factors) {
            (Some(estimate), None) => Ok(estimate),
            (None, Some(factors)) => factors.annual_loss().map_err(malformed),
            (Some(_), Some(_)) => Err(malformed(
                "supply either direct loss bounds or fairFactors, not both".to_string(),
            )),
            (None, None) => Err(malformed("no loss estimate supplied".to_string())),
        }
    }
}
