//! Loss estimates: three-point ranges and FAIR factor decompositions.

use serde::{Deserialize, Serialize};

/// Minimum / most-likely / maximum estimate of a non-negative quantity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreePointEstimate {
    /// Lower bound.
    pub min: f64,
    /// Mode.
    pub most_likely: f64,
    /// Upper bound.
    pub max: f64,
}

impl ThreePointEstimate {
    /// Creates a new estimate without validating it.
    #[inline]
    pub fn new(min: f64, most_likely: f64, max: f64) -> Self {
        Self {
            min,
            most_likely,
            max,
        }
    }

    /// Checks that all bounds are finite, non-negative and ordered.
    ///
    /// The returned message names the violated constraint and is meant to be
    /// embedded in a `PortfolioError::MalformedDistribution`.
    pub fn validate(&self, label: &str) -> Result<(), String> {
        let values = [self.min, self.most_likely, self.max];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(format!("{} bounds must be finite", label));
        }
        if self.min < 0.0 {
            return Err(format!("{} minimum {} is negative", label, self.min));
        }
        if self.min > self.most_likely {
            return Err(format!(
                "{} minimum {} exceeds most likely {}",
                label, self.min, self.most_likely
            ));
        }
        if self.most_likely > self.max {
            return Err(format!(
                "{} most likely {} exceeds maximum {}",
                label, self.most_likely, self.max
            ));
        }
        Ok(())
    }
}

/// FAIR decomposition of a loss estimate.
///
/// Annual loss is loss event frequency times per-event magnitude, where the
/// magnitude is primary plus (optional) secondary loss. Each bound of the
/// derived range combines the matching bounds of the factors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairFactors {
    /// Expected loss events per year.
    pub loss_event_frequency: ThreePointEstimate,
    /// Direct loss per event.
    pub primary_loss: ThreePointEstimate,
    /// Secondary-stakeholder loss per event.
    #[serde(default)]
    pub secondary_loss: Option<ThreePointEstimate>,
}

impl FairFactors {
    /// Derives the annual loss range.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed factor.
    ///
    /// # Examples
    ///
    /// ```
    /// use risk_core::portfolio::{FairFactors, ThreePointEstimate};
    ///
    /// let factors = FairFactors {
    ///     loss_event_frequency: ThreePointEstimate::new(0.1, 0.5, 2.0),
    ///     primary_loss: ThreePointEstimate::new(10_000.0, 40_000.0, 100_000.0),
    ///     secondary_loss: Some(ThreePointEstimate::new(0.0, 10_000.0, 50_000.0)),
    /// };
    ///
    /// let annual = factors.annual_loss().unwrap();
    /// assert_eq!(annual.min, 1_000.0);
    /// assert_eq!(annual.most_likely, 25_000.0);
    /// assert_eq!(annual.max, 300_000.0);
    /// ```
    pub fn annual_loss(&self) -> Result<ThreePointEstimate, String> {
        self.loss_event_frequency.validate("loss event frequency")?;
        self.primary_loss.validate("primary loss")?;
        let secondary = self
            .secondary_loss
            .unwrap_or_else(|| ThreePointEstimate::new(0.0, 0.0, 0.0));
        secondary.validate("secondary loss")?;

        let lef = &self.loss_event_frequency;
        let primary = &self.primary_loss;
        Ok(ThreePointEstimate::new(
            lef.min * (primary.min + secondary.min),
            lef.most_likely * (primary.most_likely + secondary.most_likely),
            lef.max * (primary.max + secondary.max),
        ))
    }
}
