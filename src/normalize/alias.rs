//! Ordered alias table: which raw column feeds which canonical field.
//!
//! Priority is data, not code. For each canonical field the entries are
//! consulted in table order and the first alias present in the raw header wins;
//! later aliases for that field are ignored even if their columns exist.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::CanonicalField;
use crate::error::AppError;
use crate::io::ingest::RawTable;

/// Upstream column names seen in exporter CSVs and forecasting notebooks.
///
/// Canonical names come first for every field so a re-exported canonical CSV
/// resolves to itself.
const BUILTIN_ALIASES: &[(&str, CanonicalField)] = &[
    ("date", CanonicalField::Date),
    ("ds", CanonicalField::Date),
    ("Date", CanonicalField::Date),
    ("actual_price", CanonicalField::ActualPrice),
    ("PriceMarket", CanonicalField::ActualPrice),
    ("PriceMarket_orig", CanonicalField::ActualPrice),
    ("Actual", CanonicalField::ActualPrice),
    ("y", CanonicalField::ActualPrice),
    ("predicted_price", CanonicalField::PredictedPrice),
    ("yhat", CanonicalField::PredictedPrice),
    ("PriceMarket_predicted", CanonicalField::PredictedPrice),
    ("Forecast_mean_orig", CanonicalField::PredictedPrice),
    ("Forecast_sum_orig", CanonicalField::PredictedPrice),
    ("predicted_lower", CanonicalField::PredictedLower),
    ("yhat_lower", CanonicalField::PredictedLower),
    ("predicted_upper", CanonicalField::PredictedUpper),
    ("yhat_upper", CanonicalField::PredictedUpper),
    ("trend", CanonicalField::Trend),
    ("Trend_mean_orig", CanonicalField::Trend),
    ("Trend_sum_orig", CanonicalField::Trend),
    ("feed_price", CanonicalField::FeedPrice),
    ("FeedPrice", CanonicalField::FeedPrice),
    ("FeedPrice_mean_orig", CanonicalField::FeedPrice),
    ("province", CanonicalField::Province),
    ("Province", CanonicalField::Province),
    ("week_index", CanonicalField::WeekIndex),
    ("Week", CanonicalField::WeekIndex),
    ("month", CanonicalField::Month),
    ("Month", CanonicalField::Month),
];

/// One `(alias, canonical_field)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub alias: String,
    pub field: CanonicalField,
}

impl AliasEntry {
    pub fn new(alias: impl Into<String>, field: CanonicalField) -> Self {
        Self {
            alias: alias.into(),
            field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

/// The raw column chosen for a canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// The alias that matched.
    pub alias: String,
    /// Header text as written in the file.
    pub header: String,
    pub index: usize,
}

/// Result of matching an alias table against a raw header.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub columns: BTreeMap<CanonicalField, ResolvedColumn>,
    /// Raw column indexes no field consumed, in header order.
    pub unused: Vec<usize>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AliasTable {
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILTIN_ALIASES
                .iter()
                .map(|&(alias, field)| AliasEntry::new(alias, field))
                .collect(),
        )
    }

    pub fn from_entries(entries: Vec<AliasEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    /// Aliases for one field, highest priority first.
    pub fn aliases_for(&self, field: CanonicalField) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.alias.as_str())
    }

    /// Prepend `overrides` so they outrank every existing entry.
    pub fn with_overrides(self, overrides: Vec<AliasEntry>) -> Self {
        let mut entries = overrides;
        entries.extend(self.entries);
        Self { entries }
    }

    /// Load override entries from a JSON array of `{ "alias", "field" }`.
    pub fn load_overrides(path: &Path) -> Result<Vec<AliasEntry>, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::input(format!("Failed to open alias file '{}': {e}", path.display()))
        })?;
        serde_json::from_reader(file)
            .map_err(|e| AppError::input(format!("Invalid alias file '{}': {e}", path.display())))
    }

    /// Match the table against a raw header.
    ///
    /// A raw column feeds at most one canonical field.
    pub fn resolve(&self, table: &RawTable) -> Resolution {
        let mut columns = BTreeMap::new();
        let mut consumed = HashSet::new();

        for field in CanonicalField::ALL {
            for alias in self.aliases_for(field) {
                let Some(index) = table.column_index(alias) else {
                    continue;
                };
                if consumed.contains(&index) {
                    continue;
                }
                consumed.insert(index);
                columns.insert(
                    field,
                    ResolvedColumn {
                        alias: alias.to_string(),
                        header: table.headers[index].clone(),
                        index,
                    },
                );
                break;
            }
        }

        let unused = (0..table.headers.len())
            .filter(|idx| !consumed.contains(idx))
            .collect();

        Resolution { columns, unused }
    }
}
