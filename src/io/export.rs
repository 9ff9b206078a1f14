//! Exports: canonical CSV, summary JSON, forecast CSV.
//!
//! Every export carries plain values. An unavailable metric is written as
//! `null` with its reason next to it, never as a number.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::DashboardRun;
use crate::domain::{CanonicalField, CanonicalRecord, DateWindow, Provenance};
use crate::error::AppError;
use crate::forecast::ForecastRow;
use crate::metrics::{Accuracy, MetricCell, MonthlyPivot, SeriesSummary, Trendline};
use crate::normalize::{CanonicalLayout, NormalizeReport};
use crate::report::Insight;

/// Write canonical records in [`CanonicalLayout`] order.
///
/// Fields the report marks as derived, backfilled, synthetic or forecast get a
/// `<field>_source` column, so re-loading the file keeps them flagged.
pub fn write_canonical_csv<W: Write>(
    writer: W,
    records: &[CanonicalRecord],
    report: &NormalizeReport,
) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    let layout = CanonicalLayout::new(report);

    out.write_record(layout.headers())
        .map_err(|e| AppError::input(format!("Failed to write CSV header: {e}")))?;

    for r in records {
        out.write_record(layout.row(r))
            .map_err(|e| AppError::input(format!("Failed to write CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::input(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_canonical_csv_file(
    path: &Path,
    records: &[CanonicalRecord],
    report: &NormalizeReport,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_canonical_csv(file, records, report)?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote canonical csv");
    Ok(())
}

/// Prophet-shaped forecast CSV (`ds,yhat,trend,yhat_lower,yhat_upper`).
pub fn write_forecast_csv<W: Write>(writer: W, rows: &[ForecastRow]) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row)
            .map_err(|e| AppError::input(format!("Failed to write forecast row: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::input(format!("Failed to flush forecast CSV: {e}")))?;
    Ok(())
}

pub fn write_forecast_csv_file(path: &Path, rows: &[ForecastRow]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create forecast CSV '{}': {e}", path.display())))?;
    write_forecast_csv(file, rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote forecast csv");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct KpiExport {
    pub count: usize,
    pub mean: MetricCell,
    pub min: MetricCell,
    pub max: MetricCell,
    pub stddev: MetricCell,
    pub volatility_pct: MetricCell,
    /// True when the field's values are backfilled or synthetic.
    pub substituted: bool,
}

impl KpiExport {
    fn new(s: &SeriesSummary, substituted: bool) -> Self {
        Self {
            count: s.count,
            mean: MetricCell::from(&s.mean),
            min: MetricCell::from(&s.min),
            max: MetricCell::from(&s.max),
            stddev: MetricCell::from(&s.stddev),
            volatility_pct: MetricCell::from(&s.volatility),
            substituted,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccuracyExport {
    pub joined: usize,
    pub mape_points: usize,
    pub mae: MetricCell,
    pub rmse: MetricCell,
    pub mape_pct: MetricCell,
}

impl From<&Accuracy> for AccuracyExport {
    fn from(a: &Accuracy) -> Self {
        Self {
            joined: a.joined,
            mape_points: a.mape_points,
            mae: MetricCell::from(&a.mae),
            rmse: MetricCell::from(&a.rmse),
            mape_pct: MetricCell::from(&a.mape),
        }
    }
}

/// The summary JSON document.
#[derive(Debug, Serialize)]
pub struct SummaryExport<'a> {
    pub source: String,
    pub rows: usize,
    pub rows_in_scope: usize,
    pub window: Option<DateWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_unavailable: Option<String>,
    pub provenance: BTreeMap<CanonicalField, &'a Provenance>,
    pub substituted_fields: Vec<CanonicalField>,
    pub kpis: BTreeMap<CanonicalField, KpiExport>,
    pub accuracy: AccuracyExport,
    pub correlation: MetricCell,
    pub trendline: Option<Trendline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trendline_unavailable: Option<String>,
    pub pivot: Option<&'a MonthlyPivot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot_unavailable: Option<String>,
    pub insights: &'a [Insight],
}

impl<'a> SummaryExport<'a> {
    pub fn from_run(run: &'a DashboardRun) -> Self {
        let report = &run.frame.report;
        let provenance = CanonicalField::ALL
            .into_iter()
            .map(|f| (f, report.provenance(f)))
            .collect();
        let kpis = [&run.actual, &run.predicted, &run.feed]
            .into_iter()
            .map(|s| (s.field, KpiExport::new(s, report.is_backfilled(s.field))))
            .collect();

        Self {
            source: run.source.display().to_string(),
            rows: run.frame.records.len(),
            rows_in_scope: run.filtered.len(),
            window: run.window.ok(),
            window_unavailable: run.window.err().map(|r| r.to_string()),
            provenance,
            substituted_fields: report.substituted_fields(),
            kpis,
            accuracy: AccuracyExport::from(&run.accuracy),
            correlation: MetricCell::from(&run.correlation),
            trendline: run.trendline.ok(),
            trendline_unavailable: run.trendline.err().map(|r| r.to_string()),
            pivot: run.pivot.as_ref().ok(),
            pivot_unavailable: run.pivot.as_ref().err().map(|r| r.to_string()),
            insights: &run.insights,
        }
    }
}

pub fn summary_json(run: &DashboardRun) -> Result<String, AppError> {
    serde_json::to_string_pretty(&SummaryExport::from_run(run))
        .map_err(|e| AppError::new(4, format!("Failed to serialize summary JSON: {e}")))
}

pub fn write_summary_json(path: &Path, run: &DashboardRun) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &SummaryExport::from_run(run))
        .map_err(|e| AppError::input(format!("Failed to write summary JSON: {e}")))?;
    tracing::info!(path = %path.display(), "wrote summary json");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use crate::app::pipeline::{LoadedFrame, analyze};
    use crate::domain::{DashboardConfig, InputConfig};
    use crate::io::ingest::{RawTable, read_raw_table};
    use crate::normalize::{AliasTable, NormalizeOptions, normalize};

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn run_for(raw: &RawTable) -> DashboardRun {
        let loaded = LoadedFrame {
            source: PathBuf::from("eggs.csv"),
            frame: normalize(raw, &AliasTable::builtin(), &NormalizeOptions::default()),
            row_errors: Vec::new(),
        };
        analyze(
            loaded,
            &DashboardConfig::new(InputConfig {
                csv: PathBuf::from("eggs.csv"),
                aliases: None,
                province_seed: 42,
                forecast: None,
            }),
        )
    }

    #[test]
    fn canonical_csv_reloads_to_the_same_records() {
        let raw = table(
            &["Date", "PriceMarket", "Province", "Note"],
            &[&["2024-01-01", "3.25", "Rayong", "a, b"], &["2024-01-08", "", "Bangkok", ""]],
        );
        let frame = normalize(&raw, &AliasTable::builtin(), &NormalizeOptions::default());

        let mut buf = Vec::new();
        write_canonical_csv(&mut buf, &frame.records, &frame.report).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with(
            "date,actual_price,predicted_price,predicted_lower,predicted_upper,trend,feed_price,province,week_index,month,\
             week_index_source,month_source,Note\n"
        ));

        let reloaded = read_raw_table(buf.as_slice()).unwrap();
        let again = normalize(&reloaded.table, &AliasTable::builtin(), &NormalizeOptions::default());
        assert_eq!(again.records, frame.records);
        assert_eq!(again.extra_columns, ["Note"]);
    }

    #[test]
    fn reloaded_export_keeps_backfill_flags() {
        let raw = table(&["ds", "yhat"], &[&["2024-01-01", "100"], &["2024-01-08", "200"]]);
        let frame = normalize(&raw, &AliasTable::builtin(), &NormalizeOptions::default());

        let mut buf = Vec::new();
        write_canonical_csv(&mut buf, &frame.records, &frame.report).unwrap();
        let reloaded = read_raw_table(buf.as_slice()).unwrap();
        let again = normalize(&reloaded.table, &AliasTable::builtin(), &NormalizeOptions::default());

        assert_eq!(again.report.substituted_fields(), frame.report.substituted_fields());
        assert_eq!(
            again.report.provenance(CanonicalField::ActualPrice),
            &Provenance::Backfilled {
                rule: "predicted_price × 0.98".to_string(),
            }
        );
        assert!(again.extra_columns.is_empty());
    }

    #[test]
    fn forecast_csv_uses_prophet_headers() {
        let rows = [ForecastRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            yhat: 3.5,
            trend: 3.25,
            yhat_lower: 3.0,
            yhat_upper: 4.0,
        }];
        let mut buf = Vec::new();
        write_forecast_csv(&mut buf, &rows).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "ds,yhat,trend,yhat_lower,yhat_upper\n2024-01-01,3.5,3.25,3.0,4.0\n"
        );
    }

    #[test]
    fn summary_json_flags_backfill_and_nulls_unavailable_metrics() {
        let run = run_for(&table(&["ds", "yhat"], &[&["2024-01-01", "100"], &["2024-01-08", "200"]]));
        let json: serde_json::Value = serde_json::from_str(&summary_json(&run).unwrap()).unwrap();

        assert_eq!(json["provenance"]["actual_price"]["kind"], "backfilled");
        assert_eq!(json["kpis"]["actual_price"]["substituted"], true);
        assert_eq!(json["kpis"]["actual_price"]["mean"]["value"], 147.0);
        assert!(json["substituted_fields"].as_array().unwrap().contains(&"actual_price".into()));

        assert!(json["kpis"]["feed_price"]["mean"]["value"].is_null());
        assert_eq!(
            json["correlation"]["unavailable"],
            "required field `feed_price` unavailable"
        );
        assert_eq!(json["window"]["from"], "2024-01-01");
    }
}
