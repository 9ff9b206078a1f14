//! CSV ingest.
//!
//! This module turns an exporter CSV into a `RawTable`: the header row plus
//! string cells, nothing typed yet. Column reconciliation and coercion belong
//! to `normalize`.
//!
//! Design goals:
//! - **Tolerant rows** (short rows are padded, long rows truncated, broken rows
//!   skipped and reported)
//! - **Untouched cells** (the raw table keeps headers and values as written so
//!   extra columns can be passed through verbatim)

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::error::AppError;

/// A header row plus string rows, all of the header's width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table, padding or truncating every row to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find a column by name, ignoring case, surrounding whitespace and a BOM.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header_name(name);
        self.headers
            .iter()
            .position(|h| normalize_header_name(h) == wanted)
    }

    /// Trimmed, non-empty cell value.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)?
            .get(col)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the table plus what was skipped.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: RawTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a CSV file from disk.
pub fn load_raw_table(path: &Path) -> Result<LoadedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let loaded = read_raw_table(file)?;
    tracing::info!(
        path = %path.display(),
        rows = loaded.table.len(),
        columns = loaded.table.headers.len(),
        skipped = loaded.row_errors.len(),
        "loaded csv"
    );
    Ok(loaded)
}

/// Read a CSV with a header row from any reader.
pub fn read_raw_table<R: Read>(reader: R) -> Result<LoadedTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AppError::input("CSV has an empty header row."));
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;
        match result {
            Ok(record) => {
                if is_blank(&record) {
                    continue;
                }
                rows.push(record.iter().map(str::to_string).collect());
            }
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping unreadable csv row");
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
            }
        }
    }

    Ok(LoadedTable {
        table: RawTable::new(headers, rows),
        row_errors,
        rows_read,
    })
}

/// Header matching key.
///
/// Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
/// first header. If we don't strip it, the first column never resolves.
pub fn normalize_header_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|c| c.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_pads_short_rows() {
        let csv = "\u{feff}Date,PriceMarket,Extra\n2024-01-01,100\n2024-01-08,101,x,overflow\n";
        let loaded = read_raw_table(csv.as_bytes()).unwrap();
        assert_eq!(loaded.table.headers, ["Date", "PriceMarket", "Extra"]);
        assert_eq!(loaded.table.rows[0], ["2024-01-01", "100", ""]);
        assert_eq!(loaded.table.rows[1], ["2024-01-08", "101", "x"]);
        assert_eq!(loaded.rows_read, 2);
    }

    #[test]
    fn skips_blank_lines() {
        let csv = "ds,y\n2024-01-01,1\n,\n2024-01-02,2\n";
        let loaded = read_raw_table(csv.as_bytes()).unwrap();
        assert_eq!(loaded.table.len(), 2);
    }

    #[test]
    fn column_lookup_ignores_case_and_bom() {
        let table = RawTable::new(vec!["\u{feff}DS".to_string(), " Yhat ".to_string()], vec![]);
        assert_eq!(table.column_index("ds"), Some(0));
        assert_eq!(table.column_index("yhat"), Some(1));
        assert_eq!(table.column_index("trend"), None);
    }

    #[test]
    fn cell_treats_whitespace_as_empty() {
        let table = RawTable::new(
            vec!["a".to_string()],
            vec![vec!["  ".to_string()], vec![" 7 ".to_string()]],
        );
        assert_eq!(table.cell(0, 0), None);
        assert_eq!(table.cell(1, 0), Some("7"));
    }
}
