//! Least squares estimation.

use ndarray::{Array1, Array2};

use crate::MathError;

/// Relative pivot tolerance for the normal equations.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Result of a least squares fit.
#[derive(Debug, Clone)]
pub struct OlsResult {
    /// Estimated coefficients, one per design column.
    pub coefficients: Array1<f64>,
    /// Residuals.
    pub residuals: Array1<f64>,
    /// R-squared.
    pub r_squared: f64,
}

/// Ordinary least squares.
///
/// Solves `argmin_beta sum((y_i - X_i * beta)^2)`. The design matrix is used
/// as given; add a column of ones for an intercept.
///
/// # Errors
/// Returns error if dimensions mismatch, there are fewer rows than columns,
/// or the design is singular.
pub fn ordinary_least_squares(y: &Array1<f64>, x: &Array2<f64>) -> Result<OlsResult, MathError> {
    weighted_least_squares(y, x, &Array1::ones(y.len()))
}

/// Weighted least squares regression.
///
/// Solves: argmin_beta sum(w_i * (y_i - X_i * beta)^2)
///
/// # Arguments
/// * `y` - Response vector (n,)
/// * `x` - Design matrix (n x p)
/// * `weights` - Non-negative observation weights (n,)
///
/// # Errors
/// Returns error if dimensions mismatch, there are fewer rows than columns,
/// or the design is singular.
pub fn weighted_least_squares(
    y: &Array1<f64>,
    x: &Array2<f64>,
    weights: &Array1<f64>,
) -> Result<OlsResult, MathError> {
    let n = y.len();
    let p = x.ncols();

    if x.nrows() != n {
        return Err(MathError::DimensionMismatch { expected: n, actual: x.nrows() });
    }
    if weights.len() != n {
        return Err(MathError::DimensionMismatch { expected: n, actual: weights.len() });
    }
    if n == 0 || p == 0 {
        return Err(MathError::EmptyData);
    }
    if n < p {
        return Err(MathError::InsufficientData { required: p, actual: n });
    }

    // Scale rows by sqrt(w) so the normal equations carry w once
    let root_w = weights.mapv(|w| w.max(0.0).sqrt());
    let y_weighted = y * &root_w;
    let mut x_weighted = x.clone();
    for (mut row, &w) in x_weighted.rows_mut().into_iter().zip(root_w.iter()) {
        row *= w;
    }

    let xtx = x_weighted.t().dot(&x_weighted);
    let xty = x_weighted.t().dot(&y_weighted);
    let coefficients = solve_linear_system(&xtx, &xty)?;

    let fitted = x.dot(&coefficients);
    let residuals = y - &fitted;

    let total_weight = weights.sum();
    let y_mean = if total_weight > 0.0 { (y * weights).sum() / total_weight } else { 0.0 };
    let ss_tot: f64 = y.iter().zip(weights).map(|(yi, wi)| wi * (yi - y_mean).powi(2)).sum();
    let ss_res: f64 = residuals.iter().zip(weights).map(|(r, wi)| wi * r.powi(2)).sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Ok(OlsResult { coefficients, residuals, r_squared })
}

/// Solve a linear system Ax = b using Gaussian elimination with partial pivoting.
fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, MathError> {
    let n = a.nrows();
    if n == 0 {
        return Err(MathError::EmptyData);
    }
    if a.ncols() != n {
        return Err(MathError::LinearAlgebra("matrix must be square".to_string()));
    }
    if b.len() != n {
        return Err(MathError::DimensionMismatch { expected: n, actual: b.len() });
    }

    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = PIVOT_TOLERANCE * scale.max(f64::MIN_POSITIVE);

    // Augmented matrix [A | b]
    let mut aug = Array2::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            if aug[[row, col]].abs() > max_val {
                max_val = aug[[row, col]].abs();
                max_row = row;
            }
        }

        if max_val <= tolerance {
            return Err(MathError::Singular { size: n });
        }

        if max_row != col {
            for j in 0..=n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        for row in (col + 1)..n {
            let factor = aug[[row, col]] / aug[[col, col]];
            for j in col..=n {
                aug[[row, j]] -= factor * aug[[col, j]];
            }
        }
    }

    // Back substitution
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = aug[[i, n]];
        for j in (i + 1)..n {
            sum -= aug[[i, j]] * x[j];
        }
        x[i] = sum / aug[[i, i]];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    fn with_intercept(x: &[f64]) -> Array2<f64> {
        Array2::from_shape_fn((x.len(), 2), |(i, j)| if j == 0 { 1.0 } else { x[i] })
    }

    #[test]
    fn ols_perfect_fit() {
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let x = with_intercept(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let result = ordinary_least_squares(&y, &x).unwrap();

        assert_relative_eq!(result.coefficients[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(result.coefficients[1], 1.0, epsilon = 1e-10);
        assert_relative_eq!(result.r_squared, 1.0, epsilon = 1e-10);
        assert!(result.residuals.iter().all(|r| r.abs() < 1e-10));
    }

    #[test]
    fn ols_recovers_intercept_and_slope() {
        let xs = [0.5, 1.5, -2.0, 3.0, 0.0, 4.5];
        let y: Array1<f64> = xs.iter().map(|x| 0.02 - 0.5 * x).collect();
        let result = ordinary_least_squares(&y, &with_intercept(&xs)).unwrap();

        assert_relative_eq!(result.coefficients[0], 0.02, epsilon = 1e-10);
        assert_relative_eq!(result.coefficients[1], -0.5, epsilon = 1e-10);
    }

    #[test]
    fn wls_downweights_outlier() {
        let y = array![1.0, 2.0, 3.0, 4.0, 100.0];
        let x = with_intercept(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let weights = array![1.0, 1.0, 1.0, 1.0, 1e-6];

        let result = weighted_least_squares(&y, &x, &weights).unwrap();

        assert_relative_eq!(result.coefficients[1], 1.0, epsilon = 0.01);
    }

    #[test]
    fn collinear_design_is_singular() {
        let y = array![1.0, 2.0, 3.0];
        let x = with_intercept(&[2.0, 2.0, 2.0]);

        assert!(matches!(ordinary_least_squares(&y, &x), Err(MathError::Singular { size: 2 })));
    }

    #[test]
    fn more_columns_than_rows() {
        let y = array![1.0];
        let x = with_intercept(&[1.0]);
        assert!(matches!(
            ordinary_least_squares(&y, &x),
            Err(MathError::InsufficientData { required: 2, actual: 1 })
        ));
    }

    #[test]
    fn dimension_mismatch() {
        let y = array![1.0, 2.0, 3.0];
        let x = with_intercept(&[1.0, 2.0]);
        assert!(matches!(
            ordinary_least_squares(&y, &x),
            Err(MathError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }
}
