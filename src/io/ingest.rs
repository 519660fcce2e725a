//! Raw-table CSV ingest.
//!
//! Long-format CSV, one cell per row:
//!
//! ```text
//! source,column,year,value[,stale]
//! worldbank,NY.GDP.MKTP.CD,2019,2.1e12
//! pwt,hc,2019,2.9,false
//! ```
//!
//! - **Strict header**: `source`, `column`, `year`, `value` are required.
//! - **Row-level validation**: bad rows are skipped and reported, not fatal.
//! - An empty `value` means absent; the row is counted but not stored.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{RawTable, RawValue, Year};
use crate::error::PanelError;

const REQUIRED_COLUMNS: [&str; 4] = ["source", "column", "year", "value"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the raw table plus what was skipped.
#[derive(Debug, Clone)]
pub struct RawIngest {
    pub table: RawTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a raw table from a long-format CSV file.
pub fn load_raw_table(path: &Path) -> Result<RawIngest, PanelError> {
    let file = File::open(path)
        .map_err(|e| PanelError::Input(format!("failed to open raw CSV '{}': {e}", path.display())))?;
    read_raw_table(file)
}

/// Load a raw table from any CSV reader.
pub fn read_raw_table<R: std::io::Read>(reader: R) -> Result<RawIngest, PanelError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);
    let missing: Vec<_> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !header_map.contains_key(**c))
        .map(|c| format!("`{c}`"))
        .collect();
    if !missing.is_empty() {
        return Err(PanelError::Input(format!(
            "raw CSV is missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let mut table = RawTable::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_used = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(Some(row)) => {
                if table.contains(&row.source, &row.column, row.year) {
                    row_errors.push(RowError {
                        line,
                        message: format!(
                            "duplicate cell {}/{}/{}; first occurrence kept",
                            row.source, row.column, row.year
                        ),
                    });
                    continue;
                }
                table.insert(&row.source, &row.column, row.year, row.value);
                rows_used += 1;
            }
            Ok(None) => {}
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for e in row_errors.iter().take(20) {
        warn!(line = e.line, "{}", e.message);
    }
    if rows_used == 0 {
        return Err(PanelError::Input(format!(
            "raw CSV has no usable rows ({rows_read} read, {} rejected)",
            row_errors.len()
        )));
    }

    info!(rows_read, rows_used, rejected = row_errors.len(), "loaded raw table");
    Ok(RawIngest {
        table,
        row_errors,
        rows_read,
        rows_used,
    })
}

struct RawRow {
    source: String,
    column: String,
    year: Year,
    value: RawValue,
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM on the first header.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

/// `Ok(None)` for a row whose value is empty (absent cell).
fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<Option<RawRow>, String> {
    let source = get_required(record, header_map, "source")?.to_string();
    let column = get_required(record, header_map, "column")?.to_string();
    let year_text = get_required(record, header_map, "year")?;
    let year = year_text
        .parse::<Year>()
        .map_err(|_| format!("invalid year '{year_text}'"))?;

    let Some(value_text) = get_optional(record, header_map, "value") else {
        return Ok(None);
    };
    let value = value_text
        .parse::<f64>()
        .map_err(|_| format!("invalid value '{value_text}'"))?;
    if !value.is_finite() {
        return Err(format!("non-finite value '{value_text}'"));
    }

    let stale = match get_optional(record, header_map, "stale") {
        None => false,
        Some(s) => parse_flag(s).ok_or_else(|| format!("invalid stale flag '{s}'"))?,
    };

    Ok(Some(RawRow {
        source,
        column,
        year,
        value: if stale { RawValue::Stale(value) } else { RawValue::Fresh(value) },
    }))
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    get_optional(record, header_map, name).ok_or_else(|| format!("missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fresh_stale_and_absent_cells() {
        let csv = "\u{feff}Source,Column,Year,Value,Stale\n\
                   worldbank,NY.GDP.MKTP.CD,2019,2.1e12,\n\
                   worldbank,NY.GDP.MKTP.CD,2020,2.0e12,yes\n\
                   worldbank,NY.GDP.MKTP.CD,2021,,\n\
                   pwt,hc,2019,2.9,0\n";
        let ingest = read_raw_table(csv.as_bytes()).unwrap();
        assert_eq!(ingest.rows_read, 4);
        assert_eq!(ingest.rows_used, 3);
        assert!(ingest.row_errors.is_empty());
        let gdp: Vec<_> = ingest.table.column("worldbank", "NY.GDP.MKTP.CD").collect();
        assert_eq!(gdp, vec![(2019, RawValue::Fresh(2.1e12)), (2020, RawValue::Stale(2.0e12))]);
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let csv = "source,column,year,value\n\
                   pwt,hc,20x9,2.9\n\
                   pwt,hc,2019,abc\n\
                   pwt,hc,2019,2.9\n\
                   pwt,hc,2019,3.0\n\
                   ,hc,2020,3.0\n";
        let ingest = read_raw_table(csv.as_bytes()).unwrap();
        assert_eq!(ingest.rows_used, 1);
        let lines: Vec<_> = ingest.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 5, 6]);
        assert!(ingest.row_errors[2].message.contains("duplicate"));
        assert_eq!(ingest.table.get("pwt", "hc", 2019), Some(RawValue::Fresh(2.9)));
    }

    #[test]
    fn missing_header_is_an_input_error() {
        let err = read_raw_table("source,year,value\npwt,2019,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PanelError::Input(ref m) if m.contains("`column`")));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn file_without_usable_rows_is_rejected() {
        let err = read_raw_table("source,column,year,value\npwt,hc,x,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PanelError::Input(_)));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(&path, "source,column,year,value\npwt,hc,2019,2.9\n").unwrap();
        let ingest = load_raw_table(&path).unwrap();
        assert_eq!(ingest.table.len(), 1);
        assert!(load_raw_table(&dir.path().join("missing.csv")).is_err());
    }
}
