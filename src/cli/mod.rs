//! Command-line parsing for the egg-price war room.
//!
//! Argument parsing and command dispatch stay separate from the
//! normalization and metrics code.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::CanonicalField;
use crate::normalize::coerce;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "warroom", version, about = "Egg price war room: normalize forecast exports, compute KPIs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// KPIs, accuracy, correlation, pivot and insights for a date range.
    Summary(SummaryArgs),
    /// Write the canonical-schema CSV (provenance goes to stderr).
    Normalize(NormalizeArgs),
    /// Print the category × month average table.
    Pivot(PivotArgs),
    /// Fit the built-in linear-trend forecaster and predict ahead.
    Forecast(ForecastArgs),
}

/// Options shared by every command that reads a CSV.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Input CSV (Prophet export, notebook output or canonical CSV).
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// JSON alias overrides: `[{"alias": "...", "field": "actual_price"}]`.
    #[arg(long, value_name = "JSON")]
    pub aliases: Option<PathBuf>,

    /// Seed for synthetic province labels (default: $WARROOM_SEED, then 42).
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct RangeArgs {
    /// First date to include.
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Last date to include (inclusive).
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Prophet-style forecast CSV to attach by date where predictions are missing.
    #[arg(long, value_name = "CSV")]
    pub forecast: Option<PathBuf>,

    /// Moving-average window for the smoothed series (1 = no smoothing).
    #[arg(long, default_value_t = NonZeroUsize::MIN)]
    pub smooth: NonZeroUsize,

    /// Pivot row field.
    #[arg(long, value_enum, default_value_t = CanonicalField::Province)]
    pub category: CanonicalField,

    /// Pivot value field.
    #[arg(long, value_enum, default_value_t = CanonicalField::ActualPrice)]
    pub value: CanonicalField,

    /// Render an ASCII chart in the terminal (the default; cancels an earlier `--no-plot`).
    #[arg(long, overrides_with = "no_plot")]
    pub plot: bool,

    /// Disable the terminal chart.
    #[arg(long, overrides_with = "plot")]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the in-range canonical rows to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the computed summary to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Write a markdown report.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output path (stdout when omitted).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PivotArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    #[arg(long, value_enum, default_value_t = CanonicalField::Province)]
    pub category: CanonicalField,

    #[arg(long, value_enum, default_value_t = CanonicalField::ActualPrice)]
    pub value: CanonicalField,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Future periods to predict.
    #[arg(long, default_value_t = 12)]
    pub horizon: usize,

    /// Days between future periods.
    #[arg(long, default_value_t = 7)]
    pub step_days: i64,

    /// Interval half-width in residual standard deviations.
    #[arg(long, default_value_t = 1.96)]
    pub z: f64,

    /// Do not use feed price as a regressor.
    #[arg(long)]
    pub no_feed: bool,

    /// Write the forecast CSV here (printed as a table otherwise).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    coerce::parse_date(s).ok_or_else(|| format!("unrecognized date '{s}' (expected e.g. 2024-01-31)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn summary_defaults() {
        let cli = Cli::try_parse_from(["warroom", "summary", "--csv", "eggs.csv"]).unwrap();
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.input.csv, PathBuf::from("eggs.csv"));
        assert_eq!(args.input.seed, None);
        assert_eq!(args.smooth.get(), 1);
        assert_eq!(args.category, CanonicalField::Province);
        assert!(!args.no_plot);
    }

    #[test]
    fn parses_dates_and_fields() {
        let cli = Cli::try_parse_from([
            "warroom",
            "pivot",
            "--csv",
            "eggs.csv",
            "--from",
            "01/02/2024",
            "--category",
            "week_index",
            "--value",
            "feed_price",
        ])
        .unwrap();
        let Command::Pivot(args) = cli.command else {
            panic!("expected pivot");
        };
        assert_eq!(args.range.from, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(args.category, CanonicalField::WeekIndex);
        assert_eq!(args.value, CanonicalField::FeedPrice);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Cli::try_parse_from(["warroom", "summary", "--csv", "a.csv", "--from", "soon"]).is_err());
        assert!(Cli::try_parse_from(["warroom", "summary", "--csv", "a.csv", "--smooth", "0"]).is_err());
        assert!(Cli::try_parse_from(["warroom", "summary"]).is_err());
    }
}
