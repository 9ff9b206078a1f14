//! Linear-trend forecasting oracle.
//!
//! Model (time `t` in weeks since the first training date):
//!
//! ```text
//! trend(t) = β0 + β1 · t
//! yhat(t)  = trend(t) + β2 · feed(t)        (β2 only when every row has feed)
//! bounds   = yhat ± z · σ,  σ² = RSS / (n − p)
//! ```
//!
//! Future periods hold the feed regressor at its last observed value.

use chrono::{Duration, NaiveDate};
use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::forecast::{ForecastOracle, ForecastRow, TrainingRow};
use crate::math;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrendOracle {
    /// Interval half-width in residual standard deviations.
    pub z: f64,
    /// Spacing of future periods.
    pub step_days: i64,
    /// Use `feed_price` as a regressor when every training row has it.
    pub use_feed: bool,
}

impl Default for LinearTrendOracle {
    fn default() -> Self {
        Self {
            z: 1.96,
            step_days: 7,
            use_feed: true,
        }
    }
}

impl ForecastOracle for LinearTrendOracle {
    fn name(&self) -> &str {
        "linear-trend"
    }

    fn fit_predict(&self, training: &[TrainingRow], horizon: usize) -> Result<Vec<ForecastRow>, AppError> {
        if self.step_days <= 0 {
            return Err(AppError::input("Forecast step must be at least one day."));
        }
        let first = training
            .first()
            .ok_or_else(|| AppError::new(3, "No dated actual prices to train the forecast on."))?
            .date;

        let feeds: Option<Vec<f64>> = if self.use_feed {
            training.iter().map(|r| r.feed_price).collect()
        } else {
            None
        };
        let p = if feeds.is_some() { 3 } else { 2 };
        let n = training.len();
        if n <= p {
            return Err(AppError::new(
                3,
                format!("Linear-trend forecast needs more than {p} dated observations, found {n}."),
            ));
        }

        let weeks = |d: NaiveDate| (d - first).num_days() as f64 / 7.0;
        let design = DMatrix::from_fn(n, p, |i, j| match j {
            0 => 1.0,
            1 => weeks(training[i].date),
            _ => feeds.as_ref().map_or(0.0, |f| f[i]),
        });
        let target = DVector::from_iterator(n, training.iter().map(|r| r.y));

        let beta = math::solve_least_squares(&design, &target)
            .ok_or_else(|| AppError::new(4, "Forecast regression is singular (dates or feed prices are constant)."))?;
        let rss = math::residual_sum_of_squares(&design, &target, &beta);
        let sigma = (rss / (n - p) as f64).sqrt();
        let feed_coef = if p == 3 { beta[2] } else { 0.0 };

        let predict = |date: NaiveDate, feed: f64| {
            let trend = beta[0] + beta[1] * weeks(date);
            let yhat = trend + feed_coef * feed;
            ForecastRow {
                date,
                yhat,
                trend,
                yhat_lower: yhat - self.z * sigma,
                yhat_upper: yhat + self.z * sigma,
            }
        };

        let mut out: Vec<ForecastRow> = training
            .iter()
            .enumerate()
            .map(|(i, r)| predict(r.date, feeds.as_ref().map_or(0.0, |f| f[i])))
            .collect();

        let last = training[n - 1];
        let last_feed = feeds.as_ref().map_or(0.0, |f| f[n - 1]);
        for k in 1..=horizon {
            let date = i64::try_from(k)
                .ok()
                .and_then(|k| self.step_days.checked_mul(k))
                .and_then(Duration::try_days)
                .and_then(|offset| last.date.checked_add_signed(offset))
                .ok_or_else(|| AppError::input("Forecast horizon runs past the supported date range."))?;
            out.push(predict(date, last_feed));
        }

        tracing::info!(
            oracle = self.name(),
            observations = n,
            horizon,
            sigma,
            with_feed = p == 3,
            "fitted forecast"
        );
        Ok(out)
    }
}
