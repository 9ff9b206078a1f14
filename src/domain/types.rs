//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory by the normalizer and the metrics engine
//! - exported to JSON/CSV
//! - compared directly in tests

use std::fmt;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A field of the canonical schema.
///
/// The serialized name (and the canonical CSV header) is the snake_case form,
/// e.g. `actual_price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum CanonicalField {
    Date,
    ActualPrice,
    PredictedPrice,
    PredictedLower,
    PredictedUpper,
    Trend,
    FeedPrice,
    Province,
    WeekIndex,
    Month,
}

/// How a canonical field's cells are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Date,
    Numeric,
    Integer,
    Category,
}

impl CanonicalField {
    /// Canonical column order (also the export column order).
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::Date,
        CanonicalField::ActualPrice,
        CanonicalField::PredictedPrice,
        CanonicalField::PredictedLower,
        CanonicalField::PredictedUpper,
        CanonicalField::Trend,
        CanonicalField::FeedPrice,
        CanonicalField::Province,
        CanonicalField::WeekIndex,
        CanonicalField::Month,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::ActualPrice => "actual_price",
            CanonicalField::PredictedPrice => "predicted_price",
            CanonicalField::PredictedLower => "predicted_lower",
            CanonicalField::PredictedUpper => "predicted_upper",
            CanonicalField::Trend => "trend",
            CanonicalField::FeedPrice => "feed_price",
            CanonicalField::Province => "province",
            CanonicalField::WeekIndex => "week_index",
            CanonicalField::Month => "month",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            CanonicalField::Date => FieldKind::Date,
            CanonicalField::ActualPrice
            | CanonicalField::PredictedPrice
            | CanonicalField::PredictedLower
            | CanonicalField::PredictedUpper
            | CanonicalField::Trend
            | CanonicalField::FeedPrice => FieldKind::Numeric,
            CanonicalField::WeekIndex | CanonicalField::Month => FieldKind::Integer,
            CanonicalField::Province => FieldKind::Category,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        CanonicalField::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One normalized row.
///
/// Every field is independently nullable. `extras` holds the untouched cells
/// of unrecognized columns, aligned with `NormalizedFrame::extra_columns`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalRecord {
    pub date: Option<NaiveDate>,
    pub actual_price: Option<f64>,
    pub predicted_price: Option<f64>,
    pub predicted_lower: Option<f64>,
    pub predicted_upper: Option<f64>,
    pub trend: Option<f64>,
    pub feed_price: Option<f64>,
    pub province: Option<String>,
    pub week_index: Option<i64>,
    /// Calendar month, 1–12.
    pub month: Option<u32>,
    pub extras: Vec<String>,
}

impl CanonicalRecord {
    /// Numeric view of a field (integer fields widen to `f64`).
    pub fn numeric(&self, field: CanonicalField) -> Option<f64> {
        match field {
            CanonicalField::ActualPrice => self.actual_price,
            CanonicalField::PredictedPrice => self.predicted_price,
            CanonicalField::PredictedLower => self.predicted_lower,
            CanonicalField::PredictedUpper => self.predicted_upper,
            CanonicalField::Trend => self.trend,
            CanonicalField::FeedPrice => self.feed_price,
            CanonicalField::WeekIndex => self.week_index.map(|w| w as f64),
            CanonicalField::Month => self.month.map(f64::from),
            CanonicalField::Date | CanonicalField::Province => None,
        }
    }

    /// Grouping key for categorical use (pivot rows).
    pub fn category(&self, field: CanonicalField) -> Option<CategoryKey> {
        match field {
            CanonicalField::Province => self.province.clone().map(CategoryKey::Text),
            CanonicalField::WeekIndex => self.week_index.map(CategoryKey::Int),
            CanonicalField::Month => self.month.map(|m| CategoryKey::Int(i64::from(m))),
            _ => None,
        }
    }

    /// Month of the record, falling back to the month of `date`.
    pub fn effective_month(&self) -> Option<u32> {
        self.month.or_else(|| self.date.map(|d| d.month()))
    }

    /// Whether a field holds a value on this row.
    pub fn has(&self, field: CanonicalField) -> bool {
        match field {
            CanonicalField::Date => self.date.is_some(),
            CanonicalField::Province => self.province.is_some(),
            other => self.numeric(other).is_some(),
        }
    }
}

/// A pivot/grouping key. Integers order numerically, then text lexically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum CategoryKey {
    Int(i64),
    Text(String),
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKey::Int(v) => write!(f, "{v}"),
            CategoryKey::Text(s) => f.write_str(s),
        }
    }
}

/// Where the values of a canonical field came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Read from a source column.
    Observed { column: String },
    /// Computed from other observed fields (e.g. month of `date`).
    Derived { rule: String },
    /// Substituted for a missing measurement using a fixed proxy.
    Backfilled { rule: String },
    /// Generated values that do not describe the data at all.
    Synthetic { rule: String },
    /// Filled in from a forecasting oracle.
    Forecast,
    /// No source and no fill rule.
    Missing,
}

impl Provenance {
    /// True for proxy or generated values that must be flagged to the reader.
    pub fn is_substituted(&self) -> bool {
        matches!(self, Provenance::Backfilled { .. } | Provenance::Synthetic { .. })
    }

    /// Cell text for the `<field>_source` column of a canonical export.
    ///
    /// `None` for observed or missing fields: those need no marker.
    pub fn marker(&self) -> Option<String> {
        match self {
            Provenance::Observed { .. } | Provenance::Missing => None,
            Provenance::Derived { rule } => Some(format!("derived: {rule}")),
            Provenance::Backfilled { rule } => Some(format!("backfilled: {rule}")),
            Provenance::Synthetic { rule } => Some(format!("synthetic: {rule}")),
            Provenance::Forecast => Some("forecast".to_string()),
        }
    }

    /// Inverse of [`Provenance::marker`].
    pub fn from_marker(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("forecast") {
            return Some(Provenance::Forecast);
        }
        let (kind, rule) = text.split_once(':')?;
        let rule = rule.trim().to_string();
        match kind.trim().to_ascii_lowercase().as_str() {
            "derived" => Some(Provenance::Derived { rule }),
            "backfilled" => Some(Provenance::Backfilled { rule }),
            "synthetic" => Some(Provenance::Synthetic { rule }),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Observed { column } => write!(f, "observed ({column})"),
            Provenance::Derived { rule } => write!(f, "derived ({rule})"),
            Provenance::Backfilled { rule } => write!(f, "BACKFILLED ({rule})"),
            Provenance::Synthetic { rule } => write!(f, "SYNTHETIC ({rule})"),
            Provenance::Forecast => f.write_str("forecast oracle"),
            Provenance::Missing => f.write_str("missing"),
        }
    }
}

/// Why a metric could not be computed.
///
/// This is deliberately distinct from zero: a displayed `0.00` always means a
/// measured zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// The canonical field could not be resolved from any column.
    MissingField(CanonicalField),
    /// The field exists but has no non-null values in scope.
    NoValues(CanonicalField),
    TooFewValues { needed: usize, found: usize },
    ZeroMean,
    ZeroVariance,
    /// Actual and predicted series share no dates.
    EmptyJoin,
    /// The date window selects no rows.
    EmptyWindow,
    /// A least-squares system could not be solved.
    Singular,
    /// The field cannot be used as a grouping key.
    NotCategorical(CanonicalField),
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::MissingField(field) => write!(f, "required field `{field}` unavailable"),
            Unavailable::NoValues(field) => write!(f, "no values for `{field}`"),
            Unavailable::TooFewValues { needed, found } => {
                write!(f, "needs at least {needed} values, found {found}")
            }
            Unavailable::ZeroMean => f.write_str("mean is zero"),
            Unavailable::ZeroVariance => f.write_str("series has zero variance"),
            Unavailable::EmptyJoin => f.write_str("actual and predicted share no dates"),
            Unavailable::EmptyWindow => f.write_str("no rows in the selected date range"),
            Unavailable::Singular => f.write_str("regression is singular"),
            Unavailable::NotCategorical(field) => write!(f, "`{field}` is not a category"),
        }
    }
}

impl std::error::Error for Unavailable {}

/// A scalar result or the reason it is unavailable.
pub type Metric = Result<f64, Unavailable>;

/// Inclusive date range `[from, to]`.
///
/// Bounds are kept as given. A window with `from > to` selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip_case_insensitively() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_name(field.name()), Some(field));
            assert_eq!(CanonicalField::from_name(&field.name().to_uppercase()), Some(field));
        }
        assert_eq!(CanonicalField::from_name("PriceMarket"), None);
    }

    #[test]
    fn category_keys_order_numbers_before_text() {
        let mut keys = vec![
            CategoryKey::Text("Rayong".to_string()),
            CategoryKey::Int(10),
            CategoryKey::Int(2),
            CategoryKey::Text("Bangkok".to_string()),
        ];
        keys.sort();
        let shown: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["2", "10", "Bangkok", "Rayong"]);
    }

    #[test]
    fn window_is_inclusive() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let w = DateWindow::new(a, b);
        assert!(!w.is_empty());
        assert!(w.contains(a));
        assert!(w.contains(b));
        assert!(!w.contains(b.succ_opt().unwrap()));
    }

    #[test]
    fn reversed_window_selects_nothing() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let w = DateWindow::new(b, a);
        assert_eq!(w.from, b);
        assert!(w.is_empty());
        assert!(!w.contains(a));
        assert!(!w.contains(b));
    }

    #[test]
    fn markers_read_back_as_the_same_provenance() {
        let cases = [
            Provenance::Derived {
                rule: "calendar month of date".to_string(),
            },
            Provenance::Backfilled {
                rule: "predicted_price × 0.98".to_string(),
            },
            Provenance::Synthetic {
                rule: "1-based row position".to_string(),
            },
            Provenance::Forecast,
        ];
        for p in cases {
            let marker = p.marker().unwrap();
            assert_eq!(Provenance::from_marker(&marker), Some(p));
        }
        let observed = Provenance::Observed {
            column: "PriceMarket".to_string(),
        };
        assert_eq!(observed.marker(), None);
        assert_eq!(Provenance::from_marker("Rayong"), None);
        assert_eq!(Provenance::from_marker("note: keep"), None);
    }

    #[test]
    fn effective_month_prefers_explicit_month() {
        let rec = CanonicalRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 2),
            month: Some(7),
            ..Default::default()
        };
        assert_eq!(rec.effective_month(), Some(7));
        let rec = CanonicalRecord { month: None, ..rec };
        assert_eq!(rec.effective_month(), Some(5));
    }
}
