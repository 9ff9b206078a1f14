//! Date-window filtering and date-ordered series extraction.

use chrono::NaiveDate;

use crate::domain::{CanonicalField, CanonicalRecord, DateWindow, Unavailable};

/// Smallest window covering every dated record.
pub fn date_span(records: &[CanonicalRecord]) -> Result<DateWindow, Unavailable> {
    let mut dates = records.iter().filter_map(|r| r.date);
    let first = dates
        .next()
        .ok_or(Unavailable::NoValues(CanonicalField::Date))?;
    let (lo, hi) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Ok(DateWindow::new(lo, hi))
}

/// Rows whose date lies in `[from, to]`; undated rows never pass.
pub fn filter_by_date(records: &[CanonicalRecord], window: DateWindow) -> Vec<CanonicalRecord> {
    records
        .iter()
        .filter(|r| r.date.is_some_and(|d| window.contains(d)))
        .cloned()
        .collect()
}

/// `(date, value)` pairs for a numeric field, sorted by date.
///
/// Rows missing either side are skipped. The sort is stable, so rows sharing
/// a date keep input order.
pub fn dated_values(records: &[CanonicalRecord], field: CanonicalField) -> Vec<(NaiveDate, f64)> {
    let mut out: Vec<(NaiveDate, f64)> = records
        .iter()
        .filter_map(|r| Some((r.date?, r.numeric(field)?)))
        .collect();
    out.sort_by_key(|(d, _)| *d);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(date: Option<(i32, u32, u32)>, price: Option<f64>) -> CanonicalRecord {
        CanonicalRecord {
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            actual_price: price,
            ..Default::default()
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn filter_is_inclusive_on_both_bounds() {
        let records = vec![
            rec(Some((2024, 1, 1)), Some(1.0)),
            rec(Some((2024, 1, 15)), Some(2.0)),
            rec(Some((2024, 1, 31)), Some(3.0)),
            rec(Some((2024, 2, 1)), Some(4.0)),
        ];
        let out = filter_by_date(&records, DateWindow::new(ymd(2024, 1, 1), ymd(2024, 1, 31)));
        let prices: Vec<f64> = out.iter().filter_map(|r| r.actual_price).collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn undated_rows_are_excluded() {
        let records = vec![rec(None, Some(9.0)), rec(Some((2024, 1, 1)), Some(1.0))];
        let window = DateWindow::new(ymd(2000, 1, 1), ymd(2100, 1, 1));
        assert_eq!(filter_by_date(&records, window).len(), 1);
    }

    #[test]
    fn filtering_leaves_input_untouched() {
        let records = vec![rec(Some((2024, 1, 1)), Some(1.0)), rec(Some((2025, 1, 1)), Some(2.0))];
        let before = records.clone();
        let _ = filter_by_date(&records, DateWindow::new(ymd(2024, 1, 1), ymd(2024, 1, 1)));
        assert_eq!(records, before);
    }

    #[test]
    fn span_covers_unsorted_dates() {
        let records = vec![
            rec(Some((2024, 5, 1)), None),
            rec(None, None),
            rec(Some((2023, 12, 1)), None),
        ];
        let span = date_span(&records).unwrap();
        assert_eq!(span.from, ymd(2023, 12, 1));
        assert_eq!(span.to, ymd(2024, 5, 1));
        assert_eq!(
            date_span(&[rec(None, Some(1.0))]),
            Err(Unavailable::NoValues(CanonicalField::Date))
        );
    }

    #[test]
    fn dated_values_sorts_and_skips_gaps() {
        let records = vec![
            rec(Some((2024, 3, 1)), Some(3.0)),
            rec(Some((2024, 1, 1)), None),
            rec(None, Some(7.0)),
            rec(Some((2024, 2, 1)), Some(2.0)),
        ];
        let series = dated_values(&records, CanonicalField::ActualPrice);
        assert_eq!(series, vec![(ymd(2024, 2, 1), 2.0), (ymd(2024, 3, 1), 3.0)]);
    }
}
