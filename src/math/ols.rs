//! Least squares solver.
//!
//! Used for two small regressions:
//!
//! ```text
//! market_price ≈ a + b · feed_price            (scatter trendline)
//! price(t)     ≈ β0 + β1 · t (+ β2 · feed)     (linear-trend forecast oracle)
//! ```
//!
//! We solve via SVD so tall design matrices (many rows, 2–3 columns) work
//! without forming the normal equations. Nalgebra's `QR::solve` is meant for
//! square systems.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.nrows() < x.ncols() {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Reject rank-deficient designs outright (e.g. a constant regressor);
    // a minimum-norm solution would look valid but mean nothing here.
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return None;
    }
    if svd.singular_values.iter().any(|&s| s <= max_sv * 1e-10) {
        return None;
    }

    let beta = svd.solve(y, 1e-12).ok()?;
    if beta.iter().all(|v| v.is_finite()) { Some(beta) } else { None }
}

/// Residual sum of squares for a solved system.
pub fn residual_sum_of_squares(x: &DMatrix<f64>, y: &DVector<f64>, beta: &DVector<f64>) -> f64 {
    let fitted = x * beta;
    (y - fitted).iter().map(|r| r * r).sum()
}
