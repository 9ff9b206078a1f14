//! Markdown dashboard report.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Local;

use crate::app::pipeline::DashboardRun;
use crate::domain::CanonicalField;
use crate::error::AppError;
use crate::metrics::SeriesSummary;
use crate::plot::render_dashboard_chart;
use crate::report::{InsightLevel, fmt_metric, fmt_pct, format_pivot};

/// Write the dashboard as a markdown file.
pub fn write_markdown_report(path: &Path, run: &DashboardRun, width: usize, height: usize) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create report '{}': {e}", path.display())))?;
    file.write_all(render_markdown_report(run, width, height).as_bytes())
        .map_err(|e| AppError::new(4, format!("Failed to write report '{}': {e}", path.display())))?;
    tracing::info!(path = %path.display(), "wrote markdown report");
    Ok(())
}

pub fn render_markdown_report(run: &DashboardRun, width: usize, height: usize) -> String {
    let mut out = String::new();

    out.push_str("# Egg price war room\n\n");
    out.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!("- source: `{}`\n", run.source.display()));
    out.push_str(&format!(
        "- rows: {} loaded, {} in scope\n",
        run.frame.records.len(),
        run.filtered.len()
    ));
    match &run.window {
        Ok(w) => out.push_str(&format!("- window: {w}\n")),
        Err(reason) => out.push_str(&format!("- window: n/a ({reason})\n")),
    }

    let substituted = run.frame.report.substituted_fields();
    if !substituted.is_empty() {
        out.push_str("\n> **Data quality:** ");
        let names: Vec<String> = substituted.iter().map(|f| format!("`{f}`")).collect();
        out.push_str(&names.join(", "));
        out.push_str(" are not measured values. See *Field sources*.\n");
    }

    out.push_str("\n## KPIs\n\n");
    out.push_str("| field | n | mean | min | max | stddev | volatility |\n");
    out.push_str("| - | - | - | - | - | - | - |\n");
    for s in [&run.actual, &run.predicted, &run.feed] {
        out.push_str(&kpi_row(s, run.frame.report.is_backfilled(s.field)));
    }

    out.push_str("\n## Forecast accuracy\n\n");
    out.push_str("| metric | value |\n| - | - |\n");
    out.push_str(&format!("| joined dates | {} |\n", run.accuracy.joined));
    out.push_str(&format!("| MAE | {} |\n", fmt_metric(&run.accuracy.mae, 4)));
    out.push_str(&format!("| RMSE | {} |\n", fmt_metric(&run.accuracy.rmse, 4)));
    out.push_str(&format!(
        "| MAPE (%) | {} |\n",
        fmt_metric(&run.accuracy.mape, 2)
    ));

    out.push_str("\n## Feed vs market\n\n");
    out.push_str(&format!("- pearson r: {}\n", fmt_metric(&run.correlation, 3)));
    match &run.trendline {
        Ok(t) => out.push_str(&format!(
            "- trendline: `{} = {:.4} + {:.4} * {}` (R² {:.3}, n={})\n",
            CanonicalField::ActualPrice,
            t.intercept,
            t.slope,
            CanonicalField::FeedPrice,
            t.r_squared,
            t.n
        )),
        Err(reason) => out.push_str(&format!("- trendline: n/a ({reason})\n")),
    }

    out.push_str("\n## Monthly pivot\n\n");
    match &run.pivot {
        Ok(pivot) => {
            out.push_str("```text\n");
            out.push_str(&format_pivot(pivot));
            out.push_str("```\n");
        }
        Err(reason) => out.push_str(&format!("n/a ({reason})\n")),
    }

    out.push_str("\n## Price chart\n\n```text\n");
    out.push_str(&render_dashboard_chart(run, width, height));
    out.push_str("```\n");

    if !run.insights.is_empty() {
        out.push_str("\n## Insights\n\n");
        for insight in &run.insights {
            let prefix = match insight.level {
                InsightLevel::Info => "",
                InsightLevel::Warning => "**Warning:** ",
            };
            out.push_str(&format!("- {prefix}{}\n", insight.message));
        }
    }

    out.push_str("\n## Field sources\n\n");
    out.push_str("| field | source | unparsed cells |\n| - | - | - |\n");
    for field in CanonicalField::ALL {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            field,
            run.frame.report.provenance(field),
            run.frame.report.coercion_failures(field)
        ));
    }

    out
}

fn kpi_row(s: &SeriesSummary, flagged: bool) -> String {
    let name = if flagged {
        format!("{} (backfilled)", s.field)
    } else {
        s.field.to_string()
    };
    format!(
        "| {name} | {} | {} | {} | {} | {} | {} |\n",
        s.count,
        fmt_metric(&s.mean, 3),
        fmt_metric(&s.min, 3),
        fmt_metric(&s.max, 3),
        fmt_metric(&s.stddev, 3),
        fmt_pct(&s.volatility),
    )
}
