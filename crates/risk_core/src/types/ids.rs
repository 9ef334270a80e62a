//! Identifier types for portfolio entities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a risk within a portfolio.
///
/// # Examples
///
/// ```
/// use risk_core::types::RiskId;
///
/// let id = RiskId::new("FAIR-2024-017");
/// assert_eq!(id.as_str(), "FAIR-2024-017");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskId(String);

impl RiskId {
    /// Creates a new risk ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RiskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RiskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RiskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
