//! CSV writing operations.

use std::path::Path;

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::CsvWriter};

use crate::common::PendingWrite;

/// Write a DataFrame to a CSV file, atomically replacing the target.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path, force: bool) -> Result<()> {
    let mut sink = PendingWrite::open(path, force)?;
    CsvWriter::new(sink.file()?)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))?;
    sink.finalize()
}

/// Round to a fixed number of decimal places for stable CSV output.
#[inline]
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::Column;

    #[test]
    fn round_to_fixed_places() {
        assert_eq!(round_to(0.50200803, 6), 0.502008);
        assert_eq!(round_to(12.345678, 4), 12.3457);
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut df = DataFrame::new(vec![
            Column::new("tract_id".into(), vec!["1000100", "1000200"]),
            Column::new("value".into(), vec![Some(1.5), None]),
        ]).unwrap();

        write_csv(&mut df, &path, false).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "tract_id,value\n1000100,1.5\n1000200,\n");
    }
}
