//! Risk premium estimate definitions.

use serde::{Deserialize, Serialize};

use crate::Period;

/// One regression coefficient from one cross-section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPremiumEstimate {
    /// Cross-section month.
    pub period: Period,
    /// Regressor name (`"intercept"` for the constant).
    pub term: String,
    /// Estimated coefficient.
    pub coefficient: f64,
}

impl RiskPremiumEstimate {
    /// Create a new estimate.
    #[must_use]
    pub fn new(period: Period, term: impl Into<String>, coefficient: f64) -> Self {
        Self { period, term: term.into(), coefficient }
    }
}
