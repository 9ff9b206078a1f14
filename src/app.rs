//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - initializes logging
//! - parses CLI arguments and resolves config (flags, `.env`, defaults)
//! - runs the dashboard pipeline
//! - prints reports/charts
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ForecastArgs, InputArgs, NormalizeArgs, PivotArgs, SummaryArgs};
use crate::domain::{DashboardConfig, ENV_LOG, EnvSettings, ForecastConfig, InputConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `warroom` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    let env = EnvSettings::from_env()?;
    init_tracing();

    match cli.command {
        Command::Summary(args) => handle_summary(args, &env),
        Command::Normalize(args) => handle_normalize(args, &env),
        Command::Pivot(args) => handle_pivot(args, &env),
        Command::Forecast(args) => handle_forecast(args, &env),
    }
}

/// Structured logs on stderr, filtered by `WARROOM_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    // Keep an already-installed subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_summary(args: SummaryArgs, env: &EnvSettings) -> Result<(), AppError> {
    let config = dashboard_config_from_args(&args, env);
    let run = pipeline::run_dashboard(&config)?;

    println!("{}", crate::report::format_summary(&run));
    match &run.pivot {
        Ok(pivot) => println!("{}", crate::report::format_pivot(pivot)),
        Err(reason) => println!("Pivot: n/a ({reason})\n"),
    }
    if config.plot {
        println!(
            "{}",
            crate::plot::render_dashboard_chart(&run, config.plot_width, config.plot_height)
        );
    }

    if let Some(path) = &config.export_csv {
        crate::io::export::write_canonical_csv_file(path, &run.filtered, &run.frame.report)?;
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_summary_json(path, &run)?;
    }
    if let Some(path) = &config.report {
        crate::report::write_markdown_report(path, &run, config.plot_width, config.plot_height)?;
    }

    Ok(())
}

fn handle_normalize(args: NormalizeArgs, env: &EnvSettings) -> Result<(), AppError> {
    let loaded = pipeline::load_frame(&input_config_from_args(&args.input, None, env))?;
    let frame = &loaded.frame;

    match &args.out {
        Some(path) => {
            crate::io::export::write_canonical_csv_file(path, &frame.records, &frame.report)?;
            println!("{}", crate::report::format_provenance(&frame.report));
        }
        None => {
            crate::io::export::write_canonical_csv(std::io::stdout().lock(), &frame.records, &frame.report)?;
            eprintln!("{}", crate::report::format_provenance(&frame.report));
        }
    }
    Ok(())
}

fn handle_pivot(args: PivotArgs, env: &EnvSettings) -> Result<(), AppError> {
    let mut config = DashboardConfig::new(input_config_from_args(&args.input, None, env));
    config.from = args.range.from;
    config.to = args.range.to;
    config.pivot_category = args.category;
    config.pivot_value = args.value;

    let run = pipeline::run_dashboard(&config)?;
    let pivot = run
        .pivot
        .map_err(|reason| AppError::new(3, format!("Pivot unavailable: {reason}.")))?;
    if run.frame.report.is_backfilled(config.pivot_category) || run.frame.report.is_backfilled(config.pivot_value) {
        println!("Note: pivot uses substituted values; see `warroom normalize` for field sources.");
    }
    println!("{}", crate::report::format_pivot(&pivot));
    Ok(())
}

fn handle_forecast(args: ForecastArgs, env: &EnvSettings) -> Result<(), AppError> {
    let config = ForecastConfig {
        input: input_config_from_args(&args.input, None, env),
        horizon: args.horizon,
        step_days: args.step_days,
        z: args.z,
        use_feed: !args.no_feed,
        out: args.out.clone(),
    };
    let run = pipeline::run_forecast(&config)?;

    if let Some(path) = &config.out {
        crate::io::export::write_forecast_csv_file(path, &run.rows)?;
    }
    println!("{}", crate::report::format_forecast(&run));
    Ok(())
}

fn input_config_from_args(args: &InputArgs, forecast: Option<PathBuf>, env: &EnvSettings) -> InputConfig {
    InputConfig {
        csv: args.csv.clone(),
        aliases: args.aliases.clone(),
        province_seed: env.resolve_seed(args.seed),
        forecast,
    }
}

pub fn dashboard_config_from_args(args: &SummaryArgs, env: &EnvSettings) -> DashboardConfig {
    DashboardConfig {
        input: input_config_from_args(&args.input, args.forecast.clone(), env),
        from: args.range.from,
        to: args.range.to,
        smooth_window: args.smooth,
        pivot_category: args.category,
        pivot_value: args.value,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_csv: args.export.clone(),
        export_json: args.export_json.clone(),
        report: args.report.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn summary_args(argv: &[&str]) -> SummaryArgs {
        let mut full = vec!["warroom", "summary"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Summary(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_override_env_seed() {
        let env = EnvSettings { province_seed: Some(9) };
        let cfg = dashboard_config_from_args(&summary_args(&["--csv", "a.csv"]), &env);
        assert_eq!(cfg.input.province_seed, 9);
        let cfg = dashboard_config_from_args(&summary_args(&["--csv", "a.csv", "--seed", "5"]), &env);
        assert_eq!(cfg.input.province_seed, 5);
    }

    #[test]
    fn plot_flags_last_one_wins() {
        let env = EnvSettings::default();
        let cfg = dashboard_config_from_args(&summary_args(&["--csv", "a.csv"]), &env);
        assert!(cfg.plot);
        assert_eq!(cfg.smooth_window.get(), 1);

        let cfg = dashboard_config_from_args(&summary_args(&["--csv", "a.csv", "--no-plot"]), &env);
        assert!(!cfg.plot);

        let cfg = dashboard_config_from_args(&summary_args(&["--csv", "a.csv", "--no-plot", "--plot"]), &env);
        assert!(cfg.plot);

        let cfg = dashboard_config_from_args(&summary_args(&["--csv", "a.csv", "--plot", "--no-plot"]), &env);
        assert!(!cfg.plot);
    }
}
