//! Formatted terminal output.
//!
//! Everything here returns a `String`; printing is left to `app`. Unavailable
//! values render as `n/a (reason)` and are never shown as zero.

use crate::app::pipeline::{DashboardRun, ForecastRun};
use crate::domain::{CanonicalField, Metric};
use crate::metrics::{Accuracy, MonthlyPivot, SeriesSummary};
use crate::normalize::NormalizeReport;
use crate::report::InsightLevel;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Full dashboard summary: KPIs, accuracy, correlation, provenance, insights.
pub fn format_summary(run: &DashboardRun) -> String {
    let mut out = String::new();

    out.push_str("=== warroom - Egg Price Dashboard ===\n");
    out.push_str(&format!("Source: {}\n", run.source.display()));
    out.push_str(&format!(
        "Rows: {} loaded | {} in scope",
        run.frame.records.len(),
        run.filtered.len()
    ));
    if !run.row_errors.is_empty() {
        out.push_str(&format!(" | {} unreadable lines skipped", run.row_errors.len()));
    }
    out.push('\n');
    match &run.window {
        Ok(w) => out.push_str(&format!("Window: {w}\n")),
        Err(reason) => out.push_str(&format!("Window: n/a ({reason})\n")),
    }

    out.push_str("\nKPIs:\n");
    out.push_str(&format_kpis(&[&run.actual, &run.predicted, &run.feed], &run.frame.report));

    out.push_str("\nForecast accuracy (actual vs predicted):\n");
    out.push_str(&format_accuracy(&run.accuracy));

    out.push_str("\nFeed vs market:\n");
    out.push_str(&format!("- pearson r : {}\n", fmt_metric(&run.correlation, 3)));
    match &run.trendline {
        Ok(t) => out.push_str(&format!(
            "- trendline : actual = {:.4} + {:.4} * feed (R² {:.3}, n={})\n",
            t.intercept, t.slope, t.r_squared, t.n
        )),
        Err(reason) => out.push_str(&format!("- trendline : n/a ({reason})\n")),
    }

    out.push_str("\nField sources:\n");
    out.push_str(&format_provenance(&run.frame.report));

    if !run.insights.is_empty() {
        out.push_str("\nInsights:\n");
        for insight in &run.insights {
            let tag = match insight.level {
                InsightLevel::Info => "-",
                InsightLevel::Warning => "!",
            };
            out.push_str(&format!("{tag} {}\n", insight.message));
        }
    }

    out
}

/// KPI table, one row per field. Substituted fields are marked with `*`.
pub fn format_kpis(summaries: &[&SeriesSummary], report: &NormalizeReport) -> String {
    let mut out = String::new();
    for s in summaries {
        let flag = if report.is_backfilled(s.field) { "*" } else { " " };
        out.push_str(&format!(
            "{flag} {:<16} n={:<5} mean={} min={} max={} vol={}\n",
            s.field.name(),
            s.count,
            fmt_metric(&s.mean, 3),
            fmt_metric(&s.min, 3),
            fmt_metric(&s.max, 3),
            fmt_pct(&s.volatility),
        ));
    }
    if summaries.iter().any(|s| report.is_backfilled(s.field)) {
        out.push_str("  (* backfilled or synthetic values; see field sources)\n");
    }
    out
}

pub fn format_accuracy(accuracy: &Accuracy) -> String {
    let mut out = String::new();
    out.push_str(&format!("- joined dates: {}\n", accuracy.joined));
    out.push_str(&format!("- MAE : {}\n", fmt_metric(&accuracy.mae, 4)));
    out.push_str(&format!("- RMSE: {}\n", fmt_metric(&accuracy.rmse, 4)));
    out.push_str(&format!(
        "- MAPE: {} over {} dates with non-zero actual\n",
        fmt_pct(&accuracy.mape),
        accuracy.mape_points
    ));
    out
}

/// Where every canonical field came from.
pub fn format_provenance(report: &NormalizeReport) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<16} {:<60} {:>8}", "field", "source", "bad").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<60} {:-<8}", "", "", "").trim_end());
    out.push('\n');
    for field in CanonicalField::ALL {
        let provenance = report.provenance(field);
        let failures = report.coercion_failures(field);
        let bad = if failures > 0 { failures.to_string() } else { String::new() };
        out.push_str(
            format!(
                "{:<16} {:<60} {:>8}",
                field.name(),
                truncate(&provenance.to_string(), 60),
                bad
            )
            .trim_end(),
        );
        out.push('\n');
    }
    if !report.extra_columns.is_empty() {
        out.push_str(&format!("pass-through: {}\n", report.extra_columns.join(", ")));
    }
    out
}

/// Category × month table; empty cells print as `-`.
pub fn format_pivot(pivot: &MonthlyPivot) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Average {} by {} and month:\n",
        pivot.value_field, pivot.category_field
    ));

    let mut header = format!("{:<14}", pivot.category_field.name());
    for m in MONTHS {
        header.push_str(&format!(" {m:>7}"));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for row in &pivot.rows {
        let mut line = format!("{:<14}", truncate(&row.category.to_string(), 14));
        for cell in &row.months {
            match cell {
                Some(v) => line.push_str(&format!(" {v:>7.2}")),
                None => line.push_str(&format!(" {:>7}", "-")),
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn format_forecast(run: &ForecastRun) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== warroom - Forecast ({}) ===\n", run.oracle));
    out.push_str(&format!("Source: {}\n", run.source.display()));
    out.push_str(&format!("Training dates: {}\n", run.training.len()));
    out.push_str("\nIn-sample accuracy:\n");
    out.push_str(&format_accuracy(&run.accuracy));

    out.push('\n');
    out.push_str(
        format!(
            "{:<12} {:>10} {:>10} {:>10} {:>10}",
            "ds", "yhat", "trend", "lower", "upper"
        )
        .trim_end(),
    );
    out.push('\n');
    for row in run.rows.iter().skip(run.training.len()) {
        out.push_str(&format!(
            "{:<12} {:>10.3} {:>10.3} {:>10.3} {:>10.3}\n",
            row.date, row.yhat, row.trend, row.yhat_lower, row.yhat_upper
        ));
    }
    out
}

pub fn fmt_metric(metric: &Metric, decimals: usize) -> String {
    match metric {
        Ok(v) => format!("{v:.decimals$}"),
        Err(reason) => format!("n/a ({reason})"),
    }
}

pub fn fmt_pct(metric: &Metric) -> String {
    match metric {
        Ok(v) => format!("{v:.2}%"),
        Err(reason) => format!("n/a ({reason})"),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
