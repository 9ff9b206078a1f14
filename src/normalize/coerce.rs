//! Cell coercion: strings to dates and numbers.
//!
//! Every function here returns `None` on failure. A bad cell becomes a null
//! cell; it never fails the row or the load.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Date formats tried first, in order.
///
/// ISO is what the forecasting notebooks write, but spreadsheet exports
/// often use `DD/MM/YYYY` or `DD-MM-YYYY`.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Timestamp formats accepted as a fallback; the time part is dropped.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    parse_date_best_effort(s)
}

fn parse_date_best_effort(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    // Compact `YYYYMMDD`.
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(s, "%Y%m%d").ok();
    }
    None
}

/// Parse a price-like cell.
///
/// Thousands separators are stripped; anything non-finite is rejected.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = s.replace(',', "");
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Parse an integer cell, accepting integral floats such as `12.0`.
pub fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let v = parse_number(s)?;
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Parse a calendar month (1–12).
pub fn parse_month(s: &str) -> Option<u32> {
    let v = parse_integer(s)?;
    if (1..=12).contains(&v) { Some(v as u32) } else { None }
}
