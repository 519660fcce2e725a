//! Ordinary least squares.
//!
//! The problems here are tiny (a trend line over a few dozen years), so we build
//! the design matrix explicitly and solve with SVD. SVD copes with tall,
//! rank-deficient designs where `QR::solve` would not.

use nalgebra::{DMatrix, DVector};

/// Solve `min ||X β - y||²` using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Progressively looser tolerances for near-singular designs.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fitted line `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
    /// Coefficient of determination; `1.0` for a perfectly flat, exact fit.
    pub r_squared: f64,
}

impl LineFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit a straight line through `(x, y)` pairs.
///
/// Needs at least two points with distinct `x`.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Option<LineFit> {
    let n = xs.len();
    if n < 2 || ys.len() != n {
        return None;
    }
    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return None;
    }

    let mut x = DMatrix::<f64>::zeros(n, 2);
    for (i, &xi) in xs.iter().enumerate() {
        x[(i, 0)] = 1.0;
        x[(i, 1)] = xi;
    }
    let y = DVector::from_column_slice(ys);

    let beta = solve_least_squares(&x, &y)?;
    let fit = LineFit {
        intercept: beta[0],
        slope: beta[1],
        r_squared: 0.0,
    };

    let mean = ys.iter().sum::<f64>() / n as f64;
    let sst: f64 = ys.iter().map(|v| (v - mean).powi(2)).sum();
    let sse: f64 = xs
        .iter()
        .zip(ys)
        .map(|(&xi, &yi)| (yi - fit.predict(xi)).powi(2))
        .sum();
    let r_squared = if sst > 0.0 { 1.0 - sse / sst } else { 1.0 };

    Some(LineFit { r_squared, ..fit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_recovers_exact_trend() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let ys: Vec<f64> = xs.iter().map(|x| 1_300.0 + 6.5 * x).collect();
        let fit = fit_line(&xs, &ys).unwrap();
        assert!((fit.intercept - 1_300.0).abs() < 1e-8);
        assert!((fit.slope - 6.5).abs() < 1e-10);
        assert!(fit.r_squared > 0.999_999);
    }

    #[test]
    fn fit_line_rejects_degenerate_input() {
        assert!(fit_line(&[1.0], &[2.0]).is_none());
        assert!(fit_line(&[1.0, 2.0], &[2.0, f64::NAN]).is_none());
    }

    #[test]
    fn flat_series_has_unit_r_squared() {
        let fit = fit_line(&[0.0, 1.0, 2.0], &[4.0, 4.0, 4.0]).unwrap();
        assert!(fit.slope.abs() < 1e-12);
        assert_eq!(fit.r_squared, 1.0);
    }
}
