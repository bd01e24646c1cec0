use std::path::Path;

use anyhow::{Context, Result};
use polars::{frame::DataFrame, prelude::Column};

use crate::{io::csv::{parse_f64, read_csv_strings, str_column, write_csv}, types::TractId};

use super::DemandRow;

const COLUMNS: [&str; 6] = ["origin_tract", "destination_tract", "norm_trips", "norm_commuters", "universal_demand", "distance_km"];

impl DemandRow {
    /// Write the universal demand table in row order.
    pub fn write_csv(rows: &[DemandRow], path: &Path, force: bool) -> Result<()> {
        let mut df = DataFrame::new(vec![
            Column::new(COLUMNS[0].into(), rows.iter().map(|r| r.origin.as_str()).collect::<Vec<_>>()),
            Column::new(COLUMNS[1].into(), rows.iter().map(|r| r.destination.as_str()).collect::<Vec<_>>()),
            Column::new(COLUMNS[2].into(), rows.iter().map(|r| r.norm_trips).collect::<Vec<_>>()),
            Column::new(COLUMNS[3].into(), rows.iter().map(|r| r.norm_commuters).collect::<Vec<_>>()),
            Column::new(COLUMNS[4].into(), rows.iter().map(|r| r.universal_demand).collect::<Vec<_>>()),
            Column::new(COLUMNS[5].into(), rows.iter().map(|r| r.distance_km).collect::<Vec<_>>()),
        ])?;
        write_csv(&mut df, path, force)
    }

    /// Read a universal demand table. The `distance_km` column is optional.
    pub fn read_csv(path: &Path) -> Result<Vec<DemandRow>> {
        let df = read_csv_strings(path)?;
        let has_distance = df.get_column_names().iter().any(|name| name.as_str() == COLUMNS[5]);

        let origins = str_column(&df, COLUMNS[0])?;
        let destinations = str_column(&df, COLUMNS[1])?;
        let norm_trips = str_column(&df, COLUMNS[2])?;
        let norm_commuters = str_column(&df, COLUMNS[3])?;
        let universal = str_column(&df, COLUMNS[4])?;
        let mut distances: Box<dyn Iterator<Item = Option<&str>> + '_> = if has_distance {
            Box::new(str_column(&df, COLUMNS[5])?)
        } else {
            Box::new(std::iter::repeat(None))
        };

        let mut rows = Vec::with_capacity(df.height());
        let cells = origins.zip(destinations).zip(norm_trips).zip(norm_commuters).zip(universal);
        for (i, ((((origin, destination), trips), commuters), demand)) in cells.enumerate() {
            let tract = |cell: Option<&str>| TractId::parse(cell.unwrap_or(""))
                .with_context(|| format!("[fusion] row {} of {}", i + 1, path.display()));
            rows.push(DemandRow {
                origin: tract(origin)?,
                destination: tract(destination)?,
                norm_trips: parse_f64(trips).unwrap_or(0.0),
                norm_commuters: parse_f64(commuters).unwrap_or(0.0),
                universal_demand: parse_f64(demand).unwrap_or(0.0),
                distance_km: distances.next().flatten().and_then(|d| parse_f64(Some(d))),
            });
        }
        Ok(rows)
    }
}
