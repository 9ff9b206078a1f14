//! Pairwise relationships between two numeric fields (feed cost vs market price).

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::domain::{CanonicalField, CanonicalRecord, Metric, Unavailable};
use crate::math;

/// Values of `x` and `y` from rows where both are present.
pub fn paired_values(records: &[CanonicalRecord], x: CanonicalField, y: CanonicalField) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter_map(|r| Some((r.numeric(x)?, r.numeric(y)?)))
        .collect()
}

/// Pearson r over rows where both fields are non-null.
pub fn pearson(records: &[CanonicalRecord], x: CanonicalField, y: CanonicalField) -> Metric {
    let pairs = paired_values(records, x, y);
    if pairs.len() < 2 {
        return Err(Unavailable::TooFewValues {
            needed: 2,
            found: pairs.len(),
        });
    }
    math::pearson(&pairs).ok_or(Unavailable::ZeroVariance)
}

/// Ordinary least squares line `y = intercept + slope · x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trendline {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n: usize,
}

impl Trendline {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

pub fn trendline(
    records: &[CanonicalRecord],
    x: CanonicalField,
    y: CanonicalField,
) -> Result<Trendline, Unavailable> {
    let pairs = paired_values(records, x, y);
    if pairs.len() < 2 {
        return Err(Unavailable::TooFewValues {
            needed: 2,
            found: pairs.len(),
        });
    }

    let n = pairs.len();
    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { pairs[i].0 });
    let target = DVector::from_iterator(n, pairs.iter().map(|p| p.1));
    let beta = math::solve_least_squares(&design, &target).ok_or(Unavailable::Singular)?;

    let rss = math::residual_sum_of_squares(&design, &target, &beta);
    let y_mean = target.mean();
    let tss: f64 = target.iter().map(|v| (v - y_mean) * (v - y_mean)).sum();
    let r_squared = if tss > 0.0 { (1.0 - rss / tss).clamp(0.0, 1.0) } else { 1.0 };

    Ok(Trendline {
        slope: beta[1],
        intercept: beta[0],
        r_squared,
        n,
    })
}
