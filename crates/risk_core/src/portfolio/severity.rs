//! ALE severity bands.

use serde::{Deserialize, Serialize};

/// Severity classification of an annualised loss expectancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityBand {
    /// ALE below 100 000.
    Low,
    /// ALE of at least 100 000.
    Medium,
    /// ALE of at least 500 000.
    High,
    /// ALE of at least 1 000 000.
    Critical,
}

impl SeverityBand {
    /// Lower bound of the `Medium` band.
    pub const MEDIUM_THRESHOLD: f64 = 100_000.0;
    /// Lower bound of the `High` band.
    pub const HIGH_THRESHOLD: f64 = 500_000.0;
    /// Lower bound of the `Critical` band.
    pub const CRITICAL_THRESHOLD: f64 = 1_000_000.0;

    /// Classifies an ALE.
    pub fn from_ale(ale: f64) -> Self {
        if ale >= Self::CRITICAL_THRESHOLD {
            SeverityBand::Critical
        } else if ale >= Self::HIGH_THRESHOLD {
            SeverityBand::High
        } else if ale >= Self::MEDIUM_THRESHOLD {
            SeverityBand::Medium
        } else {
            SeverityBand::Low
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            SeverityBand::Low => "Low",
            SeverityBand::Medium => "Medium",
            SeverityBand::High => "High",
            SeverityBand::Critical => "Critical",
        }
    }
}
