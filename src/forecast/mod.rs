//! Forecasting oracle seam.
//!
//! The dashboard treats the forecaster as a black box with a Prophet-shaped
//! contract: training rows `{ds, y, regressors...}` in, prediction rows
//! `{ds, yhat, trend, yhat_lower, yhat_upper}` out. `LinearTrendOracle` is the
//! built-in implementation; a Prophet export CSV can be attached instead.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{CanonicalField, CanonicalRecord, Provenance};
use crate::error::AppError;
use crate::normalize::NormalizedFrame;

pub mod linear;

pub use linear::LinearTrendOracle;

/// One training observation (one per date).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingRow {
    pub date: NaiveDate,
    pub y: f64,
    /// Optional regressor.
    pub feed_price: Option<f64>,
}

/// One prediction row, serialized with Prophet's column names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRow {
    #[serde(rename = "ds")]
    pub date: NaiveDate,
    pub yhat: f64,
    pub trend: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

pub trait ForecastOracle {
    fn name(&self) -> &str;

    /// Fit on `training` (sorted by date) and predict the training dates plus
    /// `horizon` future periods.
    fn fit_predict(&self, training: &[TrainingRow], horizon: usize) -> Result<Vec<ForecastRow>, AppError>;
}

/// Per-date training rows from records with a date and an actual price.
///
/// Rows sharing a date (one per province) are averaged; the feed regressor
/// averages whatever values the date has.
pub fn training_rows(records: &[CanonicalRecord]) -> Vec<TrainingRow> {
    #[derive(Default)]
    struct Acc {
        y_sum: f64,
        y_n: usize,
        feed_sum: f64,
        feed_n: usize,
    }

    let mut by_date: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
    for r in records {
        let (Some(date), Some(y)) = (r.date, r.actual_price) else {
            continue;
        };
        let acc = by_date.entry(date).or_default();
        acc.y_sum += y;
        acc.y_n += 1;
        if let Some(feed) = r.feed_price {
            acc.feed_sum += feed;
            acc.feed_n += 1;
        }
    }

    by_date
        .into_iter()
        .map(|(date, acc)| TrainingRow {
            date,
            y: acc.y_sum / acc.y_n as f64,
            feed_price: (acc.feed_n > 0).then(|| acc.feed_sum / acc.feed_n as f64),
        })
        .collect()
}

/// A new frame with forecast values attached by equal date.
///
/// Only fields that hold no values at all are filled, so observed columns are
/// never mixed with oracle output. Filled fields get `Provenance::Forecast`.
pub fn attach_forecast(frame: &NormalizedFrame, forecast: &[ForecastRow]) -> NormalizedFrame {
    let by_date: BTreeMap<NaiveDate, &ForecastRow> = forecast.iter().map(|f| (f.date, f)).collect();

    let targets: Vec<CanonicalField> = [
        CanonicalField::PredictedPrice,
        CanonicalField::Trend,
        CanonicalField::PredictedLower,
        CanonicalField::PredictedUpper,
    ]
    .into_iter()
    .filter(|f| !frame.has_values(*f))
    .collect();

    let records: Vec<CanonicalRecord> = frame
        .records
        .iter()
        .map(|r| {
            let mut out = r.clone();
            let Some(row) = r.date.and_then(|d| by_date.get(&d)) else {
                return out;
            };
            for field in &targets {
                match field {
                    CanonicalField::PredictedPrice => out.predicted_price = Some(row.yhat),
                    CanonicalField::Trend => out.trend = Some(row.trend),
                    CanonicalField::PredictedLower => out.predicted_lower = Some(row.yhat_lower),
                    CanonicalField::PredictedUpper => out.predicted_upper = Some(row.yhat_upper),
                    _ => {}
                }
            }
            out
        })
        .collect();

    let mut report = frame.report.clone();
    for field in &targets {
        if records.iter().any(|r| r.has(*field)) {
            tracing::info!(field = %field, "attached forecast values");
            report.provenance.insert(*field, Provenance::Forecast);
        }
    }

    NormalizedFrame {
        records,
        extra_columns: frame.extra_columns.clone(),
        report,
    }
}

/// Forecast rows from a normalized Prophet export.
pub fn forecast_rows_from_frame(frame: &NormalizedFrame) -> Vec<ForecastRow> {
    frame
        .records
        .iter()
        .filter_map(|r| {
            let yhat = r.predicted_price?;
            Some(ForecastRow {
                date: r.date?,
                yhat,
                trend: r.trend.unwrap_or(yhat),
                yhat_lower: r.predicted_lower.unwrap_or(yhat),
                yhat_upper: r.predicted_upper.unwrap_or(yhat),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::RawTable;
    use crate::normalize::{AliasTable, NormalizeOptions, normalize};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn frame(rows: &[&[&str]]) -> NormalizedFrame {
        let raw = RawTable::new(
            vec!["ds".to_string(), "PriceMarket".to_string(), "Province".to_string()],
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        );
        normalize(&raw, &AliasTable::builtin(), &NormalizeOptions::default())
    }

    #[test]
    fn training_rows_average_duplicate_dates() {
        let records = vec![
            CanonicalRecord {
                date: Some(day(2)),
                actual_price: Some(4.0),
                feed_price: Some(10.0),
                ..Default::default()
            },
            CanonicalRecord {
                date: Some(day(1)),
                actual_price: Some(3.0),
                ..Default::default()
            },
            CanonicalRecord {
                date: Some(day(2)),
                actual_price: Some(6.0),
                ..Default::default()
            },
            CanonicalRecord {
                date: None,
                actual_price: Some(100.0),
                ..Default::default()
            },
        ];
        let rows = training_rows(&records);
        assert_eq!(
            rows,
            vec![
                TrainingRow { date: day(1), y: 3.0, feed_price: None },
                TrainingRow { date: day(2), y: 5.0, feed_price: Some(10.0) },
            ]
        );
    }

    #[test]
    fn attach_fills_absent_fields_by_date() {
        let base = frame(&[&["2024-01-01", "3.0", "Rayong"], &["2024-01-02", "3.2", "Rayong"]]);
        let forecast = vec![ForecastRow {
            date: day(2),
            yhat: 3.3,
            trend: 3.25,
            yhat_lower: 3.0,
            yhat_upper: 3.6,
        }];
        let out = attach_forecast(&base, &forecast);
        assert_eq!(out.records[0].predicted_price, None);
        assert_eq!(out.records[1].predicted_price, Some(3.3));
        assert_eq!(out.records[1].predicted_upper, Some(3.6));
        assert_eq!(*out.report.provenance(CanonicalField::PredictedPrice), Provenance::Forecast);
        // The source frame is untouched.
        assert_eq!(base.records[1].predicted_price, None);
    }

    #[test]
    fn attach_never_overwrites_observed_columns() {
        let raw = RawTable::new(
            vec!["ds".to_string(), "y".to_string(), "yhat".to_string()],
            vec![vec!["2024-01-02".to_string(), "3".to_string(), "9.9".to_string()]],
        );
        let base = normalize(&raw, &AliasTable::builtin(), &NormalizeOptions::default());
        let forecast = vec![ForecastRow {
            date: day(2),
            yhat: 1.0,
            trend: 1.0,
            yhat_lower: 0.5,
            yhat_upper: 1.5,
        }];
        let out = attach_forecast(&base, &forecast);
        assert_eq!(out.records[0].predicted_price, Some(9.9));
        assert_eq!(out.records[0].trend, Some(1.0));
    }

    #[test]
    fn prophet_export_round_trips_into_rows() {
        let raw = RawTable::new(
            ["ds", "yhat", "trend", "yhat_lower", "yhat_upper"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![["2024-01-01", "3.1", "3.0", "2.8", "3.4"].iter().map(|s| s.to_string()).collect()],
        );
        let frame = normalize(&raw, &AliasTable::builtin(), &NormalizeOptions::default());
        let rows = forecast_rows_from_frame(&frame);
        assert_eq!(
            rows,
            vec![ForecastRow {
                date: day(1),
                yhat: 3.1,
                trend: 3.0,
                yhat_lower: 2.8,
                yhat_upper: 3.4,
            }]
        );
    }
}
