//! Forecast accuracy: MAE, RMSE and MAPE of predicted vs actual prices.
//!
//! The two series are inner-joined on date. Exports with one row per
//! province repeat dates, so each side is first averaged per date.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{CanonicalField, CanonicalRecord, Metric, Unavailable};
use crate::metrics::filter::dated_values;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accuracy {
    /// Dates present on both sides.
    pub joined: usize,
    /// Joined dates with a non-zero actual (the MAPE denominator).
    pub mape_points: usize,
    pub mae: Metric,
    pub rmse: Metric,
    /// Percent; rows with `actual == 0` are left out of the average.
    pub mape: Metric,
}

impl Accuracy {
    pub fn unavailable(reason: Unavailable) -> Self {
        Self {
            joined: 0,
            mape_points: 0,
            mae: Err(reason),
            rmse: Err(reason),
            mape: Err(reason),
        }
    }
}

/// Accuracy of `predicted_price` against `actual_price` within one record set.
pub fn accuracy(records: &[CanonicalRecord]) -> Accuracy {
    let actual = dated_values(records, CanonicalField::ActualPrice);
    let predicted = dated_values(records, CanonicalField::PredictedPrice);
    accuracy_between(&actual, &predicted)
}

/// Accuracy of two independently sourced `(date, value)` series.
pub fn accuracy_between(actual: &[(NaiveDate, f64)], predicted: &[(NaiveDate, f64)]) -> Accuracy {
    let joined = join_by_date(actual, predicted);
    if joined.is_empty() {
        return Accuracy::unavailable(Unavailable::EmptyJoin);
    }

    let n = joined.len() as f64;
    let abs_err: f64 = joined.iter().map(|(_, y, yhat)| (y - yhat).abs()).sum();
    let sq_err: f64 = joined.iter().map(|(_, y, yhat)| (y - yhat) * (y - yhat)).sum();

    let pct: Vec<f64> = joined
        .iter()
        .filter(|(_, y, _)| *y != 0.0)
        .map(|(_, y, yhat)| (y - yhat).abs() / y.abs())
        .collect();
    let mape = if pct.is_empty() {
        Err(Unavailable::TooFewValues { needed: 1, found: 0 })
    } else {
        Ok(pct.iter().sum::<f64>() / pct.len() as f64 * 100.0)
    };

    Accuracy {
        joined: joined.len(),
        mape_points: pct.len(),
        mae: Ok(abs_err / n),
        rmse: Ok((sq_err / n).sqrt()),
        mape,
    }
}

/// Inner join on date: `(date, actual, predicted)` in date order.
pub fn join_by_date(actual: &[(NaiveDate, f64)], predicted: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64, f64)> {
    let actual = mean_per_date(actual);
    let predicted = mean_per_date(predicted);
    actual
        .into_iter()
        .filter_map(|(d, y)| predicted.get(&d).map(|&yhat| (d, y, yhat)))
        .collect()
}

fn mean_per_date(series: &[(NaiveDate, f64)]) -> BTreeMap<NaiveDate, f64> {
    let mut acc: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for &(d, v) in series {
        let e = acc.entry(d).or_insert((0.0, 0));
        e.0 += v;
        e.1 += 1;
    }
    acc.into_iter()
        .map(|(d, (sum, count))| (d, sum / count as f64))
        .collect()
}
