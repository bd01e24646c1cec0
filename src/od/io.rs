use std::path::Path;

use anyhow::Result;
use polars::{frame::DataFrame, prelude::Column};

use crate::{io::csv::{parse_f64, read_csv_strings, round_to, str_column, write_csv}, types::TractId};

use super::OdMatrix;

/// Column names of an OD table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OdColumns {
    pub origin: &'static str,
    pub destination: &'static str,
    pub value: &'static str,
}

impl OdColumns {
    pub const COMMUTERS: OdColumns = OdColumns {
        origin: "origin_tract",
        destination: "destination_tract",
        value: "total_commuters",
    };

    pub const TRIPS: OdColumns = OdColumns {
        origin: "pickup_tract_id",
        destination: "dropoff_tract_id",
        value: "total_trips",
    };
}

impl OdMatrix {
    /// Write rows largest first, values rounded to `decimals` places when given.
    pub fn write_csv(&self, path: &Path, columns: OdColumns, decimals: Option<i32>, force: bool) -> Result<()> {
        let rows = self.sorted_desc();
        let origins: Vec<&str> = rows.iter().map(|r| r.origin.as_str()).collect();
        let destinations: Vec<&str> = rows.iter().map(|r| r.destination.as_str()).collect();
        let values: Vec<f64> = rows.iter()
            .map(|r| decimals.map_or(r.value, |d| round_to(r.value, d)))
            .collect();

        let mut df = DataFrame::new(vec![
            Column::new(columns.origin.into(), origins),
            Column::new(columns.destination.into(), destinations),
            Column::new(columns.value.into(), values),
        ])?;
        write_csv(&mut df, path, force)
    }

    /// Read an OD table. Ids are normalized to 7-digit tract codes; rows with an unusable
    /// id are skipped and logged, blank or non-numeric values count as 0.
    pub fn read_csv(path: &Path, columns: OdColumns) -> Result<Self> {
        let df = read_csv_strings(path)?;
        let mut skipped = 0usize;
        let mut matrix = OdMatrix::new();

        let cells = str_column(&df, columns.origin)?
            .zip(str_column(&df, columns.destination)?)
            .zip(str_column(&df, columns.value)?);
        for ((origin, destination), value) in cells {
            let origin = origin.and_then(|id| TractId::parse(id).ok());
            let destination = destination.and_then(|id| TractId::parse(id).ok());
            match (origin, destination) {
                (Some(origin), Some(destination)) => matrix.add(origin, destination, parse_f64(value).unwrap_or(0.0)),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!("[od] skipped {skipped} rows with malformed tract ids in {}", path.display());
        }
        Ok(matrix)
    }
}
