//! Sort configuration.

use portsort_primitives::Exchange;
use serde::{Deserialize, Serialize};

use crate::{BreakpointSpec, SortError};

/// How the second variable's breakpoints are formed in a bivariate sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Both variables use breakpoints from the whole reference subset.
    #[default]
    Independent,
    /// Second-variable breakpoints are computed within each primary bucket.
    Dependent,
}

/// A characteristic to sort on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortVariable {
    /// Characteristic name.
    pub name: String,
    /// Breakpoint specification.
    #[serde(default)]
    pub breakpoints: BreakpointSpec,
    /// Exclude non-positive values.
    #[serde(default = "default_require_positive")]
    pub require_positive: bool,
}

const fn default_require_positive() -> bool {
    true
}

impl SortVariable {
    /// Sort on `name` with the given breakpoints, requiring positive values.
    #[must_use]
    pub fn new(name: impl Into<String>, breakpoints: BreakpointSpec) -> Self {
        Self { name: name.into(), breakpoints, require_positive: true }
    }

    /// Accept zero and negative values.
    #[must_use]
    pub const fn allow_non_positive(mut self) -> Self {
        self.require_positive = false;
        self
    }

    /// Whether `value` may be sorted.
    #[must_use]
    pub fn accepts(&self, value: f64) -> bool {
        value.is_finite() && (!self.require_positive || value > 0.0)
    }
}

/// Configuration of a univariate or bivariate sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortConfig {
    /// First sorting variable.
    pub primary: SortVariable,
    /// Optional second sorting variable.
    #[serde(default)]
    pub secondary: Option<SortVariable>,
    /// Independent or dependent bivariate sort.
    #[serde(default)]
    pub mode: SortMode,
    /// Exchanges whose stocks define breakpoints; all stocks when empty.
    #[serde(default = "default_reference_exchanges")]
    pub reference_exchanges: Vec<Exchange>,
}

fn default_reference_exchanges() -> Vec<Exchange> {
    vec![Exchange::new("NYSE")]
}

impl SortConfig {
    /// Univariate sort with NYSE breakpoints.
    #[must_use]
    pub fn univariate(primary: SortVariable) -> Self {
        Self {
            primary,
            secondary: None,
            mode: SortMode::Independent,
            reference_exchanges: default_reference_exchanges(),
        }
    }

    /// Bivariate sort with NYSE breakpoints.
    #[must_use]
    pub fn bivariate(primary: SortVariable, secondary: SortVariable, mode: SortMode) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
            mode,
            reference_exchanges: default_reference_exchanges(),
        }
    }

    /// Use breakpoints from the given exchanges; all stocks when empty.
    #[must_use]
    pub fn with_reference_exchanges<I, E>(mut self, exchanges: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Exchange>,
    {
        self.reference_exchanges = exchanges.into_iter().map(Into::into).collect();
        self
    }

    /// Variables in sort order.
    pub fn variables(&self) -> impl Iterator<Item = &SortVariable> {
        std::iter::once(&self.primary).chain(self.secondary.as_ref())
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// Returns `SortError::InvalidConfig` for empty names or invalid
    /// breakpoint specifications.
    pub fn validate(&self) -> Result<(), SortError> {
        for variable in self.variables() {
            if variable.name.trim().is_empty() {
                return Err(SortError::InvalidConfig("sorting variable name is empty".to_string()));
            }
            variable.breakpoints.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_json() {
        let config: SortConfig =
            serde_json::from_str(r#"{"primary": {"name": "size", "breakpoints": {"groups": 2}}}"#)
                .unwrap();
        assert!(config.primary.require_positive);
        assert_eq!(config.mode, SortMode::Independent);
        assert_eq!(config.reference_exchanges, vec![Exchange::new("NYSE")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn accepts_respects_sign_rule() {
        let var = SortVariable::new("bm", BreakpointSpec::Groups(3));
        assert!(!var.accepts(0.0));
        assert!(!var.accepts(f64::NAN));
        assert!(var.accepts(0.1));
        assert!(var.allow_non_positive().accepts(-0.5));
    }

    #[test]
    fn invalid_secondary_rejected() {
        let config = SortConfig::bivariate(
            SortVariable::new("size", BreakpointSpec::Groups(2)),
            SortVariable::new("", BreakpointSpec::Groups(3)),
            SortMode::Dependent,
        );
        assert!(config.validate().is_err());
    }
}
