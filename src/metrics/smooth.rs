//! Moving-average smoothing for chart overlays.

use std::num::NonZeroUsize;

use chrono::NaiveDate;

use crate::domain::{CanonicalField, CanonicalRecord, Unavailable};
use crate::math::rolling_mean;
use crate::metrics::filter::dated_values;

/// Trailing simple moving average, minimum one period; `w = 1` is identity.
pub fn smooth(series: &[f64], window: NonZeroUsize) -> Vec<f64> {
    rolling_mean(series, window)
}

/// Date-ordered, smoothed values of a numeric field.
pub fn smoothed_series(
    records: &[CanonicalRecord],
    field: CanonicalField,
    window: NonZeroUsize,
) -> Result<Vec<(NaiveDate, f64)>, Unavailable> {
    let series = dated_values(records, field);
    if series.is_empty() {
        return Err(Unavailable::NoValues(field));
    }
    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    Ok(series
        .iter()
        .map(|(d, _)| *d)
        .zip(smooth(&values, window))
        .collect())
}
