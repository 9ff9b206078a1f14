//! Monthly average pivot (category × month), the heatmap table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{CanonicalField, CanonicalRecord, CategoryKey, FieldKind, Unavailable};

/// One category row: averages for January..December.
///
/// `None` means no observation for that month; it is never a zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub category: CategoryKey,
    pub months: [Option<f64>; 12],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPivot {
    pub category_field: CanonicalField,
    pub value_field: CanonicalField,
    /// Sorted by category.
    pub rows: Vec<PivotRow>,
}

impl MonthlyPivot {
    pub fn row(&self, category: &CategoryKey) -> Option<&PivotRow> {
        self.rows.iter().find(|r| &r.category == category)
    }

    /// Average for a category and month (1–12).
    pub fn get(&self, category: &CategoryKey, month: u32) -> Option<f64> {
        let idx = usize::try_from(month).ok()?.checked_sub(1)?;
        self.row(category)?.months.get(idx).copied().flatten()
    }
}

/// Average `value_field` per `(category_field, month)`.
///
/// The month comes from the record's `month`, or from its date when the
/// month is null.
pub fn pivot_monthly_average(
    records: &[CanonicalRecord],
    category_field: CanonicalField,
    value_field: CanonicalField,
) -> Result<MonthlyPivot, Unavailable> {
    if matches!(category_field.kind(), FieldKind::Date | FieldKind::Numeric) {
        return Err(Unavailable::NotCategorical(category_field));
    }

    let mut acc: BTreeMap<CategoryKey, [(f64, usize); 12]> = BTreeMap::new();
    for r in records {
        let (Some(category), Some(month), Some(value)) = (
            r.category(category_field),
            r.effective_month(),
            r.numeric(value_field),
        ) else {
            continue;
        };
        let Some(slot) = (month as usize).checked_sub(1).filter(|i| *i < 12) else {
            continue;
        };
        let cells = acc.entry(category).or_insert([(0.0, 0); 12]);
        cells[slot].0 += value;
        cells[slot].1 += 1;
    }

    if acc.is_empty() {
        return Err(Unavailable::NoValues(value_field));
    }

    let rows = acc
        .into_iter()
        .map(|(category, cells)| PivotRow {
            category,
            months: cells.map(|(sum, n)| if n == 0 { None } else { Some(sum / n as f64) }),
        })
        .collect();

    Ok(MonthlyPivot {
        category_field,
        value_field,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(province: &str, y: i32, m: u32, price: f64) -> CanonicalRecord {
        CanonicalRecord {
            date: NaiveDate::from_ymd_opt(y, m, 10),
            actual_price: Some(price),
            province: Some(province.to_string()),
            ..Default::default()
        }
    }

    fn key(s: &str) -> CategoryKey {
        CategoryKey::Text(s.to_string())
    }

    #[test]
    fn empty_months_are_unavailable_not_zero() {
        let pivot = pivot_monthly_average(
            &[obs("A", 2024, 1, 10.0)],
            CanonicalField::Province,
            CanonicalField::ActualPrice,
        )
        .unwrap();
        assert_eq!(pivot.get(&key("A"), 1), Some(10.0));
        assert_eq!(pivot.get(&key("A"), 2), None);
        assert_eq!(pivot.rows[0].months.len(), 12);
    }

    #[test]
    fn averages_across_years_per_month() {
        let records = vec![
            obs("Rayong", 2023, 3, 3.0),
            obs("Rayong", 2024, 3, 4.0),
            obs("Bangkok", 2024, 12, 5.0),
        ];
        let pivot = pivot_monthly_average(&records, CanonicalField::Province, CanonicalField::ActualPrice).unwrap();
        let categories: Vec<String> = pivot.rows.iter().map(|r| r.category.to_string()).collect();
        assert_eq!(categories, ["Bangkok", "Rayong"]);
        assert_eq!(pivot.get(&key("Rayong"), 3), Some(3.5));
        assert_eq!(pivot.get(&key("Bangkok"), 12), Some(5.0));
        assert_eq!(pivot.get(&key("Bangkok"), 13), None);
        assert_eq!(pivot.get(&key("Bangkok"), 0), None);
    }

    #[test]
    fn explicit_month_outranks_date() {
        let mut r = obs("A", 2024, 1, 8.0);
        r.month = Some(6);
        let pivot = pivot_monthly_average(&[r], CanonicalField::Province, CanonicalField::ActualPrice).unwrap();
        assert_eq!(pivot.get(&key("A"), 6), Some(8.0));
        assert_eq!(pivot.get(&key("A"), 1), None);
    }

    #[test]
    fn rejects_non_categorical_rows() {
        assert_eq!(
            pivot_monthly_average(&[], CanonicalField::FeedPrice, CanonicalField::ActualPrice),
            Err(Unavailable::NotCategorical(CanonicalField::FeedPrice))
        );
    }

    #[test]
    fn no_usable_rows_is_unavailable() {
        let mut r = obs("A", 2024, 1, 1.0);
        r.actual_price = None;
        assert_eq!(
            pivot_monthly_average(&[r], CanonicalField::Province, CanonicalField::ActualPrice),
            Err(Unavailable::NoValues(CanonicalField::ActualPrice))
        );
    }
}
