//! Shared dashboard pipeline used by every subcommand.
//!
//! load CSV -> resolve aliases -> normalize/backfill -> (attach forecast)
//! -> date window -> metrics -> insights
//!
//! Handlers in `app` only decide what to print or export.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::{
    CanonicalField, CanonicalRecord, DashboardConfig, DateWindow, ForecastConfig, InputConfig, Metric, Unavailable,
};
use crate::error::AppError;
use crate::forecast::{self, ForecastOracle, ForecastRow, LinearTrendOracle, TrainingRow};
use crate::io::ingest::{RowError, load_raw_table};
use crate::metrics::{self, Accuracy, MonthlyPivot, SeriesSummary, Trendline};
use crate::normalize::{AliasTable, NormalizeOptions, NormalizedFrame, normalize};
use crate::report::{Insight, build_insights};

/// A normalized input file plus what ingest skipped.
#[derive(Debug, Clone)]
pub struct LoadedFrame {
    pub source: PathBuf,
    pub frame: NormalizedFrame,
    pub row_errors: Vec<RowError>,
}

/// All computed outputs of one `warroom summary` run.
#[derive(Debug, Clone)]
pub struct DashboardRun {
    pub source: PathBuf,
    pub frame: NormalizedFrame,
    pub row_errors: Vec<RowError>,
    /// The applied window, or why no window could be applied.
    pub window: Result<DateWindow, Unavailable>,
    /// Records the metrics were computed over.
    pub filtered: Vec<CanonicalRecord>,

    pub actual: SeriesSummary,
    pub predicted: SeriesSummary,
    pub feed: SeriesSummary,
    pub accuracy: Accuracy,
    /// Pearson r, feed price vs actual price.
    pub correlation: Metric,
    pub trendline: Result<Trendline, Unavailable>,
    pub pivot: Result<MonthlyPivot, Unavailable>,
    pub smooth_window: NonZeroUsize,
    pub smoothed: Result<Vec<(NaiveDate, f64)>, Unavailable>,
    pub insights: Vec<Insight>,
}

/// Outputs of one `warroom forecast` run.
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub source: PathBuf,
    pub oracle: String,
    pub training: Vec<TrainingRow>,
    /// In-sample fit followed by the future periods.
    pub rows: Vec<ForecastRow>,
    /// In-sample accuracy of the fitted values.
    pub accuracy: Accuracy,
}

pub fn alias_table(overrides: Option<&Path>) -> Result<AliasTable, AppError> {
    let table = AliasTable::builtin();
    match overrides {
        Some(path) => {
            let entries = AliasTable::load_overrides(path)?;
            tracing::info!(path = %path.display(), entries = entries.len(), "loaded alias overrides");
            Ok(table.with_overrides(entries))
        }
        None => Ok(table),
    }
}

/// Load, normalize and (optionally) attach a forecast export.
pub fn load_frame(input: &InputConfig) -> Result<LoadedFrame, AppError> {
    let aliases = alias_table(input.aliases.as_deref())?;
    let options = NormalizeOptions {
        province_seed: input.province_seed,
    };

    let loaded = load_raw_table(&input.csv)?;
    if loaded.table.is_empty() {
        return Err(AppError::new(
            3,
            format!("No data rows in '{}'.", input.csv.display()),
        ));
    }
    let mut frame = normalize(&loaded.table, &aliases, &options);

    if let Some(path) = &input.forecast {
        let export = load_raw_table(path)?;
        let rows = forecast::forecast_rows_from_frame(&normalize(&export.table, &aliases, &options));
        if rows.is_empty() {
            return Err(AppError::new(
                3,
                format!("Forecast file '{}' has no rows with both a date and a prediction.", path.display()),
            ));
        }
        frame = forecast::attach_forecast(&frame, &rows);
    }

    Ok(LoadedFrame {
        source: input.csv.clone(),
        frame,
        row_errors: loaded.row_errors,
    })
}

/// Execute the full dashboard pipeline.
pub fn run_dashboard(config: &DashboardConfig) -> Result<DashboardRun, AppError> {
    let loaded = load_frame(&config.input)?;
    Ok(analyze(loaded, config))
}

/// Compute every dashboard metric over an already loaded frame.
///
/// Never fails: each metric carries its own `Unavailable` reason.
pub fn analyze(loaded: LoadedFrame, config: &DashboardConfig) -> DashboardRun {
    let LoadedFrame {
        source,
        frame,
        row_errors,
    } = loaded;

    let window = frame
        .require_dates()
        .and_then(|()| metrics::date_span(&frame.records))
        .map(|span| DateWindow::new(config.from.unwrap_or(span.from), config.to.unwrap_or(span.to)));

    let filtered = match &window {
        Ok(w) => {
            if w.is_empty() {
                tracing::warn!(window = %w, "date range starts after it ends");
            }
            metrics::filter_by_date(&frame.records, *w)
        }
        Err(reason) => {
            if config.from.is_some() || config.to.is_some() {
                tracing::warn!(reason = %reason, "date range ignored");
            }
            frame.records.clone()
        }
    };

    // A window that selects nothing makes every metric unavailable for that reason.
    let scope: Result<&[CanonicalRecord], Unavailable> = if window.is_ok() && filtered.is_empty() {
        Err(Unavailable::EmptyWindow)
    } else {
        Ok(filtered.as_slice())
    };
    let time_scope = window.and(scope);

    let summary = |field: CanonicalField| match scope {
        Ok(records) => metrics::summarize(records, field),
        Err(reason) => SeriesSummary::unavailable(field, reason),
    };
    let actual = summary(CanonicalField::ActualPrice);
    let predicted = summary(CanonicalField::PredictedPrice);
    let feed = summary(CanonicalField::FeedPrice);

    let accuracy = match time_scope {
        Ok(records) => metrics::accuracy(records),
        Err(reason) => Accuracy::unavailable(reason),
    };

    let feed_vs_actual = metrics::require_field(&frame.report, CanonicalField::FeedPrice)
        .and(metrics::require_field(&frame.report, CanonicalField::ActualPrice))
        .and(scope);
    let correlation = feed_vs_actual
        .and_then(|records| metrics::pearson(records, CanonicalField::FeedPrice, CanonicalField::ActualPrice));
    let trendline = feed_vs_actual
        .and_then(|records| metrics::trendline(records, CanonicalField::FeedPrice, CanonicalField::ActualPrice));

    let pivot = scope.and_then(|records| {
        metrics::require_field(&frame.report, config.pivot_category)?;
        metrics::require_field(&frame.report, config.pivot_value)?;
        metrics::pivot_monthly_average(records, config.pivot_category, config.pivot_value)
    });

    let smoothed = time_scope
        .and_then(|records| metrics::smoothed_series(records, CanonicalField::ActualPrice, config.smooth_window));

    let insights = build_insights(&actual, &correlation, &frame.report);

    tracing::info!(
        rows = frame.records.len(),
        in_window = filtered.len(),
        insights = insights.len(),
        "computed dashboard"
    );

    DashboardRun {
        source,
        frame,
        row_errors,
        window,
        filtered,
        actual,
        predicted,
        feed,
        accuracy,
        correlation,
        trendline,
        pivot,
        smooth_window: config.smooth_window,
        smoothed,
        insights,
    }
}

/// Fit the built-in oracle on the actual price series and predict ahead.
pub fn run_forecast(config: &ForecastConfig) -> Result<ForecastRun, AppError> {
    let loaded = load_frame(&config.input)?;
    let oracle = LinearTrendOracle {
        z: config.z,
        step_days: config.step_days,
        use_feed: config.use_feed,
    };
    forecast_frame(loaded, &oracle, config.horizon)
}

pub fn forecast_frame(
    loaded: LoadedFrame,
    oracle: &dyn ForecastOracle,
    horizon: usize,
) -> Result<ForecastRun, AppError> {
    let frame = &loaded.frame;
    frame
        .require_dates()
        .map_err(|reason| AppError::new(3, format!("Cannot forecast: {reason}.")))?;
    metrics::require_field(&frame.report, CanonicalField::ActualPrice)
        .map_err(|reason| AppError::new(3, format!("Cannot forecast: {reason}.")))?;
    if frame.report.is_backfilled(CanonicalField::ActualPrice) {
        return Err(AppError::new(
            3,
            format!(
                "Cannot forecast: actual_price is {}; training on it would fit the old forecast.",
                frame.report.provenance(CanonicalField::ActualPrice)
            ),
        ));
    }

    let training = forecast::training_rows(&frame.records);
    let rows = oracle.fit_predict(&training, horizon)?;

    let actual: Vec<(NaiveDate, f64)> = training.iter().map(|t| (t.date, t.y)).collect();
    let fitted: Vec<(NaiveDate, f64)> = rows.iter().take(training.len()).map(|r| (r.date, r.yhat)).collect();
    let accuracy = metrics::accuracy_between(&actual, &fitted);

    Ok(ForecastRun {
        source: loaded.source,
        oracle: oracle.name().to_string(),
        training,
        rows,
        accuracy,
    })
}
