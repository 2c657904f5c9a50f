//! End-to-end pipeline configuration.

use portsort_panel::{AvailabilityRule, JoinConfig};
use portsort_primitives::Exchange;
use portsort_sorts::{BreakpointSpec, SortConfig, SortMode, SortVariable};
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_NEWEY_WEST_LAGS, FamaMacBethConfig, ModelError, NeweyWest, Weighting};

/// Settings for the join, sort, aggregation and regression stages.
///
/// Every field has a default, so a JSON document only needs to name what it
/// changes:
///
/// ```
/// use portsort_model::PipelineConfig;
///
/// let config = PipelineConfig::from_json_str(
///     r#"{ "primary": "mktcap", "secondary": "bm", "characteristics": ["beta", "bm"] }"#,
/// )
/// .unwrap();
/// assert_eq!(config.newey_west_lags, 6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Publication lag of accounting reports.
    pub lag: AvailabilityRule,
    /// Accounting values older than this many months become undefined.
    pub max_staleness_months: Option<u32>,
    /// First sorting characteristic.
    pub primary: String,
    /// Optional second sorting characteristic.
    pub secondary: Option<String>,
    /// Breakpoints of the primary variable.
    pub breakpoints: BreakpointSpec,
    /// Breakpoints of the secondary variable; same as `breakpoints` when unset.
    pub secondary_breakpoints: Option<BreakpointSpec>,
    /// Independent or dependent bivariate sort.
    pub sort_mode: SortMode,
    /// Exchanges whose stocks define breakpoints.
    pub reference_exchanges: Vec<Exchange>,
    /// Exclude non-positive sorting values.
    pub require_positive: bool,
    /// Portfolio weighting.
    pub weighting: Weighting,
    /// Regressors of the cross-sectional regressions.
    pub characteristics: Vec<String>,
    /// Response of the cross-sectional regressions.
    pub response: String,
    /// Newey-West truncation lag.
    pub newey_west_lags: usize,
    /// AR(1) prewhitening before the Newey-West estimate.
    pub prewhiten: bool,
    /// Minimum rows per regression; `k + 2` when unset.
    pub min_observations_per_period: Option<usize>,
    /// Cross-sectional winsorization of the regressors.
    pub winsorize: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lag: AvailabilityRule::default(),
            max_staleness_months: None,
            primary: "mktcap".to_string(),
            secondary: None,
            breakpoints: BreakpointSpec::default(),
            secondary_breakpoints: None,
            sort_mode: SortMode::default(),
            reference_exchanges: vec![Exchange::new("NYSE")],
            require_positive: true,
            weighting: Weighting::default(),
            characteristics: Vec::new(),
            response: "ret_lead".to_string(),
            newey_west_lags: DEFAULT_NEWEY_WEST_LAGS,
            prewhiten: false,
            min_observations_per_period: None,
            winsorize: None,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    /// Returns `ModelError::Json` for malformed input and
    /// `ModelError::ConfigurationError` for invalid settings.
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `ModelError::Json` if serialization fails.
    pub fn to_json_string(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every stage's settings.
    ///
    /// Regression settings are checked only when characteristics are named;
    /// a portfolio-only configuration leaves them empty.
    ///
    /// # Errors
    /// Returns `ModelError::ConfigurationError` describing the first problem.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.join_config().validate().map_err(|e| ModelError::ConfigurationError(e.to_string()))?;
        self.sort_config().validate().map_err(|e| ModelError::ConfigurationError(e.to_string()))?;
        if self.characteristics.is_empty() {
            return Ok(());
        }
        self.fama_macbeth_config().validate()
    }

    /// Settings of the accounting join.
    #[must_use]
    pub const fn join_config(&self) -> JoinConfig {
        JoinConfig { availability: self.lag, max_staleness_months: self.max_staleness_months }
    }

    /// Settings of the portfolio sort.
    #[must_use]
    pub fn sort_config(&self) -> SortConfig {
        let variable = |name: &str, breakpoints: BreakpointSpec| SortVariable {
            name: name.to_string(),
            breakpoints,
            require_positive: self.require_positive,
        };
        let primary = variable(&self.primary, self.breakpoints.clone());
        let config = match &self.secondary {
            Some(name) => {
                let breakpoints =
                    self.secondary_breakpoints.clone().unwrap_or_else(|| self.breakpoints.clone());
                SortConfig::bivariate(primary, variable(name, breakpoints), self.sort_mode)
            }
            None => SortConfig::univariate(primary),
        };
        config.with_reference_exchanges(self.reference_exchanges.iter().cloned())
    }

    /// Standard error settings of the time-series step.
    #[must_use]
    pub const fn newey_west(&self) -> NeweyWest {
        NeweyWest { lags: self.newey_west_lags, prewhiten: self.prewhiten }
    }

    /// Settings of the Fama-MacBeth regressions.
    #[must_use]
    pub fn fama_macbeth_config(&self) -> FamaMacBethConfig {
        FamaMacBethConfig {
            response: self.response.clone(),
            characteristics: self.characteristics.clone(),
            min_observations: self.min_observations_per_period,
            newey_west: self.newey_west(),
            winsorize: self.winsorize,
        }
    }
}
