//! Sample quantiles.

use crate::MathError;

/// Quantile of an ascending slice using linear interpolation.
///
/// With `n` values the quantile sits at position `h = (n - 1) * p`; the result
/// interpolates between the order statistics around `h`. This matches the
/// default method of R (`type = 7`) and numpy.
///
/// # Errors
/// Returns `MathError::EmptyData` for an empty slice and
/// `MathError::InvalidPercentile` if `p` is outside `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Result<f64, MathError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(MathError::InvalidPercentile { value: p, range: "[0, 1]" });
    }
    let n = sorted.len();
    if n == 0 {
        return Err(MathError::EmptyData);
    }

    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;

    Ok(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Quantiles of unsorted data at each probability in `probs`.
///
/// Non-finite values are ignored. The output has one entry per probability
/// and is non-decreasing whenever `probs` is.
///
/// # Errors
/// Returns `MathError::EmptyData` if no finite value remains and
/// `MathError::InvalidPercentile` for probabilities outside `[0, 1]`.
pub fn quantiles(values: &[f64], probs: &[f64]) -> Result<Vec<f64>, MathError> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    probs.iter().map(|&p| quantile_sorted(&sorted, p)).collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0.0, 10.0)]
    #[case(0.5, 25.0)]
    #[case(1.0, 40.0)]
    #[case(0.3, 19.0)]
    #[case(0.7, 31.0)]
    fn linear_interpolation(#[case] p: f64, #[case] expected: f64) {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        assert_relative_eq!(quantile_sorted(&sorted, p).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn single_value_is_every_quantile() {
        assert_relative_eq!(quantile_sorted(&[3.5], 0.25).unwrap(), 3.5);
    }

    #[test]
    fn quantiles_sort_and_skip_nan() {
        let q = quantiles(&[40.0, f64::NAN, 10.0, 30.0, 20.0], &[0.5]).unwrap();
        assert_relative_eq!(q[0], 25.0);
    }

    #[test]
    fn quantiles_monotone() {
        let values: Vec<f64> = (0..97).map(|i| ((i * 37) % 101) as f64).collect();
        let probs: Vec<f64> = (1..10).map(|k| k as f64 / 10.0).collect();
        let q = quantiles(&values, &probs).unwrap();
        assert!(q.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn empty_and_invalid_inputs() {
        assert!(matches!(quantiles(&[f64::NAN], &[0.5]), Err(MathError::EmptyData)));
        assert!(matches!(
            quantile_sorted(&[1.0], 1.5),
            Err(MathError::InvalidPercentile { .. })
        ));
    }
}
