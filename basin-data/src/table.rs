//! Reader for per-feature monthly value tables.
//!
//! # Format
//!
//! Tab- or comma-delimited text (detected from the header line) with one
//! identity column and any number of month columns. Month columns are named
//! with the full English month name or its three-letter abbreviation, in any
//! case. Other columns are ignored.
//!
//! ```text
//! GRID_ID	Jan	Feb	Mar
//! 11	1.10	1.05	0.98
//! ```
//!
//! A file listing only some months is a seasonal source covering exactly
//! those months. Cells that are empty or not numbers become NaN and are
//! reported with a warning.

use crate::{
    aggregate::{MonthlySource, MonthlyValueRow},
    error::{DataError, Result},
};
use basin_utils::dates::{month_from_name, month_index};
use chrono::Month;
use csv::{ReaderBuilder, Trim};
use log::{info, warn};
use std::path::Path;

fn detect_delimiter(text: &str) -> u8 {
    match text.lines().next() {
        Some(header) if header.contains('\t') => b'\t',
        _ => b',',
    }
}

/// Parse a monthly value table held in memory.
pub fn parse_monthly_table(text: &str, id_column: &str, name: &str) -> Result<MonthlySource> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let id_index = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(id_column.trim()))
        .ok_or_else(|| DataError::MissingIdColumn {
            column: id_column.to_string(),
            table: name.to_string(),
        })?;
    let month_columns = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != id_index)
        .filter_map(|(i, h)| month_from_name(h).map(|m| (i, m)))
        .collect::<Vec<(usize, Month)>>();
    if month_columns.is_empty() {
        return Err(DataError::NoMonthColumns(name.to_string()));
    }

    let mut rows = Vec::new();
    let mut substitutions = 0usize;
    for result in rdr.records() {
        let record = result?;
        let id = record.get(id_index).unwrap_or_default();
        if id.is_empty() {
            if record.iter().any(|cell| !cell.is_empty()) {
                warn!("{name}: skipping row without {id_column} value");
            }
            continue;
        }
        let mut values = [f64::NAN; 12];
        for (column, month) in &month_columns {
            let cell = record.get(*column).unwrap_or_default();
            values[month_index(*month)] = match cell.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    warn!(
                        "{name}: {id_column} {id}, {}: {cell:?} is not a number, using NaN",
                        headers.get(*column).unwrap_or_default()
                    );
                    substitutions += 1;
                    f64::NAN
                }
            };
        }
        rows.push(MonthlyValueRow::new(id, values));
    }

    let mut months = month_columns.iter().map(|(_, m)| *m).collect::<Vec<Month>>();
    months.sort_by_key(|m| month_index(*m));
    months.dedup();

    Ok(MonthlySource {
        name: name.to_string(),
        months,
        rows,
        substitutions,
    })
}

/// Read a monthly value table from disk.
pub fn read_monthly_table<P: AsRef<Path>>(path: P, id_column: &str) -> Result<MonthlySource> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let source = parse_monthly_table(&text, id_column, &path.display().to_string())?;
    info!(
        "read {} rows covering {} months from {} ({} cells replaced with NaN)",
        source.rows.len(),
        source.months.len(),
        path.display(),
        source.substitutions
    );
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    static PRECIP_JFM: &str = include_str!("../../fixtures/precip_delta_jfm.txt");
    static WATER_USE: &str = include_str!("../../fixtures/water_use.csv");

    #[test]
    fn test_seasonal_table() {
        let source = parse_monthly_table(PRECIP_JFM, "GRID_ID", "jfm").unwrap();
        assert_eq!(source.months, vec![Month::January, Month::February, Month::March]);
        assert_eq!(source.rows.len(), 4);
        assert_eq!(source.rows[0].id, "11");
        assert_eq!(source.rows[0].value(Month::January), 1.10);
        // "-9999x" and the empty March cell of tile 31.
        assert_eq!(source.substitutions, 2);
        assert!(source.rows[1].value(Month::February).is_nan());
        assert!(source.rows[2].value(Month::March).is_nan());
        // Months outside the file are NaN.
        assert!(source.rows[0].value(Month::July).is_nan());
    }

    #[test]
    fn test_full_year_csv() {
        let source = parse_monthly_table(WATER_USE, "site_id", "water use").unwrap();
        assert_eq!(source.months.len(), 12);
        assert_eq!(source.rows.len(), 3);
        assert_eq!(source.rows[1].value(Month::July), 0.09);
        assert!(source.rows[2].value(Month::December).is_nan());
        assert_eq!(source.substitutions, 1);
    }

    #[test]
    fn test_missing_id_column() {
        let err = parse_monthly_table(PRECIP_JFM, "HUC", "jfm").unwrap_err();
        assert!(matches!(err, DataError::MissingIdColumn { .. }));
    }

    #[test]
    fn test_no_month_columns() {
        let err = parse_monthly_table("ID,NAME\n1,a\n", "ID", "bad").unwrap_err();
        assert!(matches!(err, DataError::NoMonthColumns(_)));
    }

    #[test]
    fn test_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amj.txt");
        std::fs::write(&path, "ID\tApril\tMay\tJune\nA\t1\t2\t3\n").unwrap();
        let source = read_monthly_table(&path, "ID").unwrap();
        assert_eq!(source.months, vec![Month::April, Month::May, Month::June]);
        assert_eq!(source.rows[0].value(Month::June), 3.0);
    }
}
