use std::{collections::BTreeMap, path::Path};

use anyhow::{ensure, Result};
use polars::{frame::DataFrame, prelude::Column};

use crate::{io::csv::{parse_f64, read_csv_strings, round_to, str_column, write_csv}, types::{TractId, ZoneId}};

use super::Crosswalk;

impl Crosswalk {
    /// Write `LocationID,census_tract_id,apportion_weight`, weights to 6 decimal places.
    pub fn write_csv(&self, path: &Path, force: bool) -> Result<()> {
        let rows = self.rows();
        let mut zones = Vec::with_capacity(rows);
        let mut tracts = Vec::with_capacity(rows);
        let mut weights = Vec::with_capacity(rows);
        for (zone, list) in self.iter() {
            for (tract, weight) in list {
                zones.push(zone.0 as u32);
                tracts.push(tract.as_str());
                weights.push(round_to(*weight, 6));
            }
        }

        let mut df = DataFrame::new(vec![
            Column::new("LocationID".into(), zones),
            Column::new("census_tract_id".into(), tracts),
            Column::new("apportion_weight".into(), weights),
        ])?;
        write_csv(&mut df, path, force)
    }

    /// Read a crosswalk file as written, without refiltering. Rows with an unusable
    /// zone, tract or weight are skipped and logged.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let df = read_csv_strings(path)?;
        let mut zones: BTreeMap<ZoneId, Vec<(TractId, f64)>> = BTreeMap::new();
        let mut skipped = 0usize;

        let columns = str_column(&df, "LocationID")?
            .zip(str_column(&df, "census_tract_id")?)
            .zip(str_column(&df, "apportion_weight")?);
        for ((zone, tract), weight) in columns {
            let zone = parse_f64(zone)
                .filter(|z| z.fract() == 0.0)
                .and_then(|z| ZoneId::checked(z as i64));
            let tract = tract.and_then(|t| TractId::parse(t).ok());
            match (zone, tract, parse_f64(weight)) {
                (Some(zone), Some(tract), Some(weight)) => zones.entry(zone).or_default().push((tract, weight)),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!("[crosswalk] skipped {skipped} malformed rows in {}", path.display());
        }
        ensure!(!zones.is_empty(), "[crosswalk] no usable rows in {}", path.display());
        Ok(Self { zones })
    }
}
