//! Run configuration.
//!
//! Values resolve as: CLI flag, then environment (`.env` is loaded first),
//! then the built-in default.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::domain::CanonicalField;
use crate::error::AppError;
use crate::normalize::DEFAULT_PROVINCE_SEED;

pub const ENV_SEED: &str = "WARROOM_SEED";
pub const ENV_LOG: &str = "WARROOM_LOG";

/// Settings read from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub province_seed: Option<u64>,
}

impl EnvSettings {
    /// Load `.env` (if present) and read `WARROOM_*` variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let province_seed = match lookup(ENV_SEED) {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| AppError::input(format!("Invalid {ENV_SEED}='{raw}': {e}")))?,
            ),
            _ => None,
        };
        Ok(Self { province_seed })
    }

    /// CLI flag, then environment, then default.
    pub fn resolve_seed(&self, flag: Option<u64>) -> u64 {
        flag.or(self.province_seed).unwrap_or(DEFAULT_PROVINCE_SEED)
    }
}

/// Where the data comes from and how it is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct InputConfig {
    pub csv: PathBuf,
    /// JSON alias overrides, tried before the built-in aliases.
    pub aliases: Option<PathBuf>,
    pub province_seed: u64,
    /// Prophet-style forecast export to attach by date.
    pub forecast: Option<PathBuf>,
}

/// Full dashboard run (`warroom summary`).
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub input: InputConfig,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub smooth_window: NonZeroUsize,
    pub pivot_category: CanonicalField,
    pub pivot_value: CanonicalField,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

impl DashboardConfig {
    pub fn new(input: InputConfig) -> Self {
        Self {
            input,
            from: None,
            to: None,
            smooth_window: NonZeroUsize::MIN,
            pivot_category: CanonicalField::Province,
            pivot_value: CanonicalField::ActualPrice,
            plot: false,
            plot_width: 100,
            plot_height: 25,
            export_csv: None,
            export_json: None,
            report: None,
        }
    }
}

/// Forecast run (`warroom forecast`).
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    pub input: InputConfig,
    pub horizon: usize,
    pub step_days: i64,
    pub z: f64,
    pub use_feed: bool,
    pub out: Option<PathBuf>,
}
