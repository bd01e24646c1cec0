//! CSV reading operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::CsvReadOptions};

use crate::common::require_file_exists;

/// Reads a CSV file with a header row, keeping every column as a string so identifiers
/// keep their leading zeros. Numeric columns are parsed by the caller.
pub(crate) fn read_csv_strings(path: &Path) -> Result<DataFrame> {
    require_file_exists(path)?;
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Iterate a string column by name.
pub(crate) fn str_column<'a>(df: &'a DataFrame, name: &str) -> Result<impl Iterator<Item = Option<&'a str>> + 'a> {
    let column = df.column(name)
        .with_context(|| format!("[io::csv::read] missing column {name:?}"))?;
    let values = column.str()
        .with_context(|| format!("[io::csv::read] column {name:?} is not a string column"))?;
    Ok(values.into_iter())
}

/// Parse an optional numeric cell; blanks and unparsable text become None.
#[inline]
pub(crate) fn parse_f64(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_handles_blanks_and_garbage() {
        assert_eq!(parse_f64(Some(" 2.5 ")), Some(2.5));
        assert_eq!(parse_f64(Some("")), None);
        assert_eq!(parse_f64(Some("NaN")), None);
        assert_eq!(parse_f64(Some("abc")), None);
        assert_eq!(parse_f64(None), None);
    }

    #[test]
    fn reads_every_column_as_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "tract_id,value\n0100100,3\n1000200,\n").unwrap();

        let df = read_csv_strings(&path).unwrap();
        let ids: Vec<_> = str_column(&df, "tract_id").unwrap().collect();
        assert_eq!(ids, vec![Some("0100100"), Some("1000200")]);

        let values: Vec<_> = str_column(&df, "value").unwrap().map(parse_f64).collect();
        assert_eq!(values, vec![Some(3.0), None]);

        assert!(str_column(&df, "missing").is_err());
    }
}
