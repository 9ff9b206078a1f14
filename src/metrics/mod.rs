//! Metrics & filter engine.
//!
//! Pure functions over canonical records: nothing here mutates its input or
//! fails the whole computation. Each operation returns its own value or its
//! own `Unavailable` reason.
//!
//! - date-window filtering (`filter`)
//! - KPI scalars (`summary`)
//! - Pearson r and OLS trendline (`correlation`)
//! - MAE/RMSE/MAPE (`accuracy`)
//! - monthly pivot (`pivot`)
//! - moving-average smoothing (`smooth`)

use crate::domain::{CanonicalField, Provenance, Unavailable};
use crate::normalize::NormalizeReport;

pub mod accuracy;
pub mod correlation;
pub mod filter;
pub mod pivot;
pub mod smooth;
pub mod summary;

pub use accuracy::{Accuracy, accuracy, accuracy_between};
pub use correlation::{Trendline, pearson, trendline};
pub use filter::{date_span, dated_values, filter_by_date};
pub use pivot::{MonthlyPivot, PivotRow, pivot_monthly_average};
pub use smooth::{smooth, smoothed_series};
pub use summary::{MetricCell, SeriesSummary, summarize};

/// `MissingField` when the normalizer found no source or fill rule for `field`.
///
/// Lets callers tell "no such column" apart from "column present, no values".
pub fn require_field(report: &NormalizeReport, field: CanonicalField) -> Result<(), Unavailable> {
    match report.provenance(field) {
        Provenance::Missing => Err(Unavailable::MissingField(field)),
        _ => Ok(()),
    }
}
