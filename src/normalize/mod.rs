//! Schema normalization: raw exporter tables to the canonical frame.
//!
//! Steps, in order:
//! 1. resolve raw columns through the ordered alias table (`alias`)
//! 2. coerce every resolved cell (`coerce`); a bad cell becomes null
//! 3. apply fill rules to fields that are entirely absent or entirely null
//!    (`backfill`), recording each one in the provenance table
//!
//! The raw table is never mutated. Rows with an unparseable date are kept with
//! a null date; dropping them is a decision for the metrics engine.

use std::collections::BTreeMap;

use crate::domain::{CanonicalField, CanonicalRecord, FieldKind, Provenance, Unavailable};
use crate::io::ingest::RawTable;

pub mod alias;
pub mod backfill;
pub mod coerce;

pub use alias::{AliasEntry, AliasTable, Resolution, ResolvedColumn};
pub use backfill::{ACTUAL_FROM_PREDICTED_FACTOR, DEFAULT_PROVINCE_SEED, SYNTHETIC_PROVINCES};

static MISSING: Provenance = Provenance::Missing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Seed for synthetic province labels.
    pub province_seed: u64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            province_seed: DEFAULT_PROVINCE_SEED,
        }
    }
}

/// Suffix of the export column that carries a field's provenance.
pub const SOURCE_SUFFIX: &str = "_source";

/// Name of the provenance marker column for `field`, e.g. `actual_price_source`.
pub fn source_column(field: CanonicalField) -> String {
    format!("{}{SOURCE_SUFFIX}", field.name())
}

/// What the normalizer did, field by field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizeReport {
    pub rows: usize,
    pub provenance: BTreeMap<CanonicalField, Provenance>,
    /// Alias that matched, per resolved field.
    pub matched_aliases: BTreeMap<CanonicalField, String>,
    /// Non-empty cells that failed to coerce, per field.
    pub coercion_failures: BTreeMap<CanonicalField, usize>,
    pub extra_columns: Vec<String>,
}

impl NormalizeReport {
    pub fn provenance(&self, field: CanonicalField) -> &Provenance {
        self.provenance.get(&field).unwrap_or(&MISSING)
    }

    /// True when the field holds backfilled or synthetic values.
    pub fn is_backfilled(&self, field: CanonicalField) -> bool {
        self.provenance(field).is_substituted()
    }

    pub fn substituted_fields(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| self.is_backfilled(*f))
            .collect()
    }

    /// Source column a field was read from, if any.
    pub fn resolved_column(&self, field: CanonicalField) -> Option<&str> {
        match self.provenance(field) {
            Provenance::Observed { column } => Some(column),
            _ => None,
        }
    }

    /// Alias-table entry that selected the field's column, if any.
    pub fn resolved_alias(&self, field: CanonicalField) -> Option<&str> {
        self.matched_aliases.get(&field).map(String::as_str)
    }

    pub fn coercion_failures(&self, field: CanonicalField) -> usize {
        self.coercion_failures.get(&field).copied().unwrap_or(0)
    }
}

/// Column layout of a canonical export.
///
/// Every canonical field, then one `<field>_source` marker per field that was
/// not read from a column, then the pass-through columns. Normalizing an export
/// reads the markers back, so substituted values stay flagged.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalLayout {
    markers: Vec<(CanonicalField, String)>,
    extra_columns: Vec<String>,
}

impl CanonicalLayout {
    pub fn new(report: &NormalizeReport) -> Self {
        let markers = CanonicalField::ALL
            .into_iter()
            .filter_map(|f| report.provenance(f).marker().map(|m| (f, m)))
            .collect();
        Self {
            markers,
            extra_columns: report.extra_columns.clone(),
        }
    }

    pub fn headers(&self) -> Vec<String> {
        CanonicalField::ALL
            .iter()
            .map(|f| f.name().to_string())
            .chain(self.markers.iter().map(|(f, _)| source_column(*f)))
            .chain(self.extra_columns.iter().cloned())
            .collect()
    }

    pub fn row(&self, record: &CanonicalRecord) -> Vec<String> {
        CanonicalField::ALL
            .iter()
            .map(|f| format_cell(record, *f))
            .chain(self.markers.iter().map(|(_, m)| m.clone()))
            .chain(record.extras.iter().cloned())
            .collect()
    }
}

/// The canonical record set for one loaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrame {
    pub records: Vec<CanonicalRecord>,
    /// Headers of pass-through columns, aligned with `CanonicalRecord::extras`.
    pub extra_columns: Vec<String>,
    pub report: NormalizeReport,
}

impl NormalizedFrame {
    /// Time-series operations need at least one parsed date.
    pub fn require_dates(&self) -> Result<(), Unavailable> {
        if matches!(self.report.provenance(CanonicalField::Date), Provenance::Missing) {
            return Err(Unavailable::MissingField(CanonicalField::Date));
        }
        if !self.has_values(CanonicalField::Date) {
            return Err(Unavailable::NoValues(CanonicalField::Date));
        }
        Ok(())
    }

    pub fn has_values(&self, field: CanonicalField) -> bool {
        self.records.iter().any(|r| r.has(field))
    }

    /// Canonical-schema table in [`CanonicalLayout`] order.
    ///
    /// Normalizing the result again yields the same records and the same
    /// substitution flags.
    pub fn to_raw_table(&self) -> RawTable {
        let layout = CanonicalLayout::new(&self.report);
        let rows = self.records.iter().map(|r| layout.row(r)).collect();
        RawTable::new(layout.headers(), rows)
    }
}

/// Render one canonical cell the way `to_raw_table` writes it.
pub fn format_cell(record: &CanonicalRecord, field: CanonicalField) -> String {
    match field {
        CanonicalField::Date => record.date.map(|d| d.format("%Y-%m-%d").to_string()),
        CanonicalField::Province => record.province.clone(),
        CanonicalField::WeekIndex => record.week_index.map(|w| w.to_string()),
        CanonicalField::Month => record.month.map(|m| m.to_string()),
        // `Display` for f64 is the shortest string that parses back exactly.
        other => record.numeric(other).map(|v| v.to_string()),
    }
    .unwrap_or_default()
}

/// Normalize a raw table against an alias table.
pub fn normalize(raw: &RawTable, aliases: &AliasTable, options: &NormalizeOptions) -> NormalizedFrame {
    let mut resolution = aliases.resolve(raw);

    let mut provenance = BTreeMap::new();
    let mut matched_aliases = BTreeMap::new();
    for (field, col) in &resolution.columns {
        tracing::info!(field = %field, column = %col.header, alias = %col.alias, "resolved column");
        provenance.insert(
            *field,
            Provenance::Observed {
                column: col.header.clone(),
            },
        );
        matched_aliases.insert(*field, col.alias.clone());
    }

    // Re-read canonical exports keep their substitution flags.
    for field in CanonicalField::ALL {
        if !resolution.columns.contains_key(&field) {
            continue;
        }
        let Some(idx) = raw.column_index(&source_column(field)) else {
            continue;
        };
        if !resolution.unused.contains(&idx) {
            continue;
        }
        let Some(restored) = (0..raw.len())
            .find_map(|row| raw.cell(row, idx))
            .and_then(Provenance::from_marker)
        else {
            continue;
        };
        tracing::info!(field = %field, provenance = %restored, "restored provenance from export marker");
        resolution.unused.retain(|&i| i != idx);
        provenance.insert(field, restored);
    }

    let extra_columns: Vec<String> = resolution
        .unused
        .iter()
        .map(|&idx| raw.headers[idx].clone())
        .collect();

    let mut coercion_failures: BTreeMap<CanonicalField, usize> = BTreeMap::new();
    let mut records = Vec::with_capacity(raw.len());

    for (row_idx, row) in raw.rows.iter().enumerate() {
        let mut record = CanonicalRecord {
            extras: resolution.unused.iter().map(|&idx| row[idx].clone()).collect(),
            ..Default::default()
        };
        for (field, col) in &resolution.columns {
            let Some(cell) = raw.cell(row_idx, col.index) else {
                continue;
            };
            if !assign_cell(&mut record, *field, cell) {
                *coercion_failures.entry(*field).or_insert(0) += 1;
            }
        }
        records.push(record);
    }

    for (field, count) in &coercion_failures {
        tracing::warn!(field = %field, cells = count, "cells failed to coerce and were nulled");
    }

    apply_backfills(&mut records, &mut provenance, options);

    let report = NormalizeReport {
        rows: records.len(),
        provenance,
        matched_aliases,
        coercion_failures,
        extra_columns: extra_columns.clone(),
    };

    NormalizedFrame {
        records,
        extra_columns,
        report,
    }
}

/// Coerce and store one cell. Returns `false` when the cell did not parse.
fn assign_cell(record: &mut CanonicalRecord, field: CanonicalField, cell: &str) -> bool {
    match field.kind() {
        FieldKind::Date => {
            record.date = coerce::parse_date(cell);
            record.date.is_some()
        }
        FieldKind::Category => {
            record.province = Some(cell.to_string());
            true
        }
        FieldKind::Integer => match field {
            CanonicalField::Month => {
                record.month = coerce::parse_month(cell);
                record.month.is_some()
            }
            _ => {
                record.week_index = coerce::parse_integer(cell);
                record.week_index.is_some()
            }
        },
        FieldKind::Numeric => {
            let value = coerce::parse_number(cell);
            match field {
                CanonicalField::ActualPrice => record.actual_price = value,
                CanonicalField::PredictedPrice => record.predicted_price = value,
                CanonicalField::PredictedLower => record.predicted_lower = value,
                CanonicalField::PredictedUpper => record.predicted_upper = value,
                CanonicalField::Trend => record.trend = value,
                CanonicalField::FeedPrice => record.feed_price = value,
                _ => {}
            }
            value.is_some()
        }
    }
}

fn apply_backfills(
    records: &mut [CanonicalRecord],
    provenance: &mut BTreeMap<CanonicalField, Provenance>,
    options: &NormalizeOptions,
) {
    if !any_values(records, CanonicalField::ActualPrice) && any_values(records, CanonicalField::PredictedPrice) {
        for r in records.iter_mut() {
            r.actual_price = backfill::actual_from_predicted(r.predicted_price);
        }
        let rule = format!("predicted_price × {ACTUAL_FROM_PREDICTED_FACTOR}");
        tracing::warn!(field = "actual_price", rule = %rule, "backfilled actual prices from the forecast");
        provenance.insert(CanonicalField::ActualPrice, Provenance::Backfilled { rule });
    }

    if !any_values(records, CanonicalField::Province) && !records.is_empty() {
        for (idx, r) in records.iter_mut().enumerate() {
            r.province = Some(backfill::synthetic_province(options.province_seed, idx).to_string());
        }
        let rule = format!("seeded draw from fixed province list (seed {})", options.province_seed);
        tracing::warn!(field = "province", rule = %rule, "synthesized province labels");
        provenance.insert(CanonicalField::Province, Provenance::Synthetic { rule });
    }

    if !any_values(records, CanonicalField::WeekIndex) && !records.is_empty() {
        for (idx, r) in records.iter_mut().enumerate() {
            r.week_index = Some(backfill::week_from_position(idx));
        }
        tracing::warn!(field = "week_index", "assigned week index from row position");
        provenance.insert(
            CanonicalField::WeekIndex,
            Provenance::Synthetic {
                rule: "1-based row position".to_string(),
            },
        );
    }

    if !any_values(records, CanonicalField::Month) && any_values(records, CanonicalField::Date) {
        for r in records.iter_mut() {
            r.month = r.effective_month();
        }
        tracing::info!(field = "month", "derived month from date");
        provenance.insert(
            CanonicalField::Month,
            Provenance::Derived {
                rule: "calendar month of date".to_string(),
            },
        );
    }
}

fn any_values(records: &[CanonicalRecord], field: CanonicalField) -> bool {
    records.iter().any(|r| r.has(field))
}
