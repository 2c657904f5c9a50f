//! Percentile breakpoints and bucket assignment.

use portsort_math::quantiles;
use portsort_primitives::Bucket;
use serde::{Deserialize, Serialize};

use crate::SortError;

/// Largest number of buckets a single variable may be split into.
const MAX_GROUPS: u16 = 1000;

/// How a variable's cross-section is split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointSpec {
    /// `g` equally populated groups, cutpoints at `k / g` for `k = 1..g`.
    Groups(u16),
    /// Explicit interior percentiles in (0, 1), strictly increasing.
    Percentiles(Vec<f64>),
}

impl Default for BreakpointSpec {
    fn default() -> Self {
        Self::Groups(5)
    }
}

impl BreakpointSpec {
    /// Fama-French 30th and 70th percentiles.
    #[must_use]
    pub fn terciles_30_70() -> Self {
        Self::Percentiles(vec![0.3, 0.7])
    }

    /// Interior probabilities, ascending.
    #[must_use]
    pub fn probabilities(&self) -> Vec<f64> {
        match self {
            Self::Groups(g) => (1..*g).map(|k| f64::from(k) / f64::from(*g)).collect(),
            Self::Percentiles(p) => p.clone(),
        }
    }

    /// Number of buckets produced.
    #[must_use]
    pub fn num_buckets(&self) -> usize {
        match self {
            Self::Groups(g) => usize::from(*g),
            Self::Percentiles(p) => p.len() + 1,
        }
    }

    /// Check the specification.
    ///
    /// # Errors
    /// Returns `SortError::InvalidConfig` for fewer than two groups, more than
    /// the supported maximum, or percentiles that are empty, outside (0, 1)
    /// or not strictly increasing.
    pub fn validate(&self) -> Result<(), SortError> {
        match self {
            Self::Groups(g) if *g < 2 || *g > MAX_GROUPS => Err(SortError::InvalidConfig(format!(
                "number of groups must be in 2..={MAX_GROUPS}, got {g}"
            ))),
            Self::Percentiles(p) if p.is_empty() || p.len() >= usize::from(MAX_GROUPS) => {
                Err(SortError::InvalidConfig(format!("expected 1 to {} percentiles", MAX_GROUPS - 1)))
            }
            Self::Percentiles(p) if p.iter().any(|x| !(*x > 0.0 && *x < 1.0)) => {
                Err(SortError::InvalidConfig(format!("percentiles must lie in (0, 1), got {p:?}")))
            }
            Self::Percentiles(p) if p.windows(2).any(|w| w[0] >= w[1]) => Err(SortError::InvalidConfig(
                format!("percentiles must be strictly increasing, got {p:?}"),
            )),
            _ => Ok(()),
        }
    }
}

/// Cutpoints of `values` at the interior probabilities of `spec`.
///
/// Non-finite values are ignored. The cutpoints are non-decreasing; ties in
/// the data may make neighbours equal.
///
/// # Errors
/// Returns `SortError::InsufficientData` if no finite value is given, or
/// `SortError::InvalidConfig` for an invalid `spec`.
pub fn compute_breakpoints(
    variable: &str,
    values: &[f64],
    spec: &BreakpointSpec,
) -> Result<Vec<f64>, SortError> {
    spec.validate()?;
    if !values.iter().any(|v| v.is_finite()) {
        return Err(SortError::InsufficientData { variable: variable.to_string() });
    }
    Ok(quantiles(values, &spec.probabilities())?)
}

/// Bucket of `value` under right-closed intervals.
///
/// Bucket 1 holds `x <= c1`, bucket `k` holds `c(k-1) < x <= ck` and the last
/// bucket holds `x > c(g-1)`. Equal cutpoints leave the buckets between them
/// empty.
#[must_use]
pub fn assign_bucket(value: f64, cutpoints: &[f64]) -> Bucket {
    let below = cutpoints.partition_point(|c| *c < value);
    Bucket::from_index(u16::try_from(below).unwrap_or(u16::MAX))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn median_split_of_four_values() {
        let values = [10.0, 20.0, 30.0, 40.0];
        let cuts = compute_breakpoints("x", &values, &BreakpointSpec::Groups(2)).unwrap();
        assert_eq!(cuts.len(), 1);
        assert_relative_eq!(cuts[0], 25.0);

        let buckets: Vec<u16> = values.iter().map(|v| assign_bucket(*v, &cuts).get()).collect();
        assert_eq!(buckets, vec![1, 1, 2, 2]);
    }

    #[rstest]
    #[case(25.0, 1)]
    #[case(25.000_001, 2)]
    #[case(-1e9, 1)]
    #[case(1e9, 2)]
    fn right_closed(#[case] value: f64, #[case] expected: u16) {
        assert_eq!(assign_bucket(value, &[25.0]).get(), expected);
    }

    #[test]
    fn fama_french_percentiles() {
        let values = [10.0, 20.0, 30.0, 40.0];
        let cuts = compute_breakpoints("bm", &values, &BreakpointSpec::terciles_30_70()).unwrap();
        assert_relative_eq!(cuts[0], 19.0, epsilon = 1e-12);
        assert_relative_eq!(cuts[1], 31.0, epsilon = 1e-12);
    }

    #[test]
    fn collapsed_cutpoints_leave_empty_buckets() {
        let values = [1.0, 1.0, 1.0, 1.0, 5.0];
        let cuts = compute_breakpoints("x", &values, &BreakpointSpec::Groups(4)).unwrap();
        assert_eq!(cuts, vec![1.0, 1.0, 1.0]);

        assert_eq!(assign_bucket(1.0, &cuts).get(), 1);
        assert_eq!(assign_bucket(5.0, &cuts).get(), 4);
    }

    #[test]
    fn breakpoints_are_monotone() {
        let values: Vec<f64> = (0..257).map(|i| ((i * 7919) % 263) as f64 * 0.37 - 20.0).collect();
        for g in [2, 3, 5, 10, 20] {
            let cuts = compute_breakpoints("x", &values, &BreakpointSpec::Groups(g)).unwrap();
            assert_eq!(cuts.len(), usize::from(g) - 1);
            assert!(cuts.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn every_value_gets_exactly_one_bucket() {
        let values: Vec<f64> = (0..100).map(|i| f64::from(i % 13)).collect();
        let spec = BreakpointSpec::Groups(10);
        let cuts = compute_breakpoints("x", &values, &spec).unwrap();
        for v in &values {
            let bucket = assign_bucket(*v, &cuts).get();
            assert!((1..=10).contains(&bucket));
        }
    }

    #[test]
    fn no_valid_values_is_insufficient() {
        let err = compute_breakpoints("size", &[f64::NAN], &BreakpointSpec::Groups(2)).unwrap_err();
        assert!(matches!(err, SortError::InsufficientData { variable } if variable == "size"));
        assert!(compute_breakpoints("size", &[], &BreakpointSpec::Groups(2)).is_err());
    }

    #[rstest]
    #[case(BreakpointSpec::Groups(1))]
    #[case(BreakpointSpec::Groups(0))]
    #[case(BreakpointSpec::Percentiles(vec![]))]
    #[case(BreakpointSpec::Percentiles(vec![0.0, 0.5]))]
    #[case(BreakpointSpec::Percentiles(vec![0.7, 0.3]))]
    #[case(BreakpointSpec::Percentiles(vec![0.5, 0.5]))]
    #[case(BreakpointSpec::Percentiles(vec![f64::NAN]))]
    fn invalid_specs(#[case] spec: BreakpointSpec) {
        assert!(matches!(spec.validate(), Err(SortError::InvalidConfig(_))));
    }

    #[test]
    fn spec_deserializes_from_json() {
        let spec: BreakpointSpec = serde_json::from_str(r#"{"percentiles":[0.3,0.7]}"#).unwrap();
        assert_eq!(spec, BreakpointSpec::terciles_30_70());
        let spec: BreakpointSpec = serde_json::from_str(r#"{"groups":10}"#).unwrap();
        assert_eq!(spec.num_buckets(), 10);
    }
}
