//! Tract demographics from the ACS 5-year API: total population and median household income.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use polars::{frame::DataFrame, prelude::Column};
use serde::Deserialize;
use serde_json::Value;

use crate::{common::{Fetcher, Source}, io::csv::write_csv, types::{Borough, TractId}};

pub const ACS_BASE_URL: &str = "https://api.census.gov/data";
pub const POPULATION_VAR: &str = "B01003_001E";
pub const INCOME_VAR: &str = "B19013_001E";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AcsConfig {
    pub base_url: String,
    pub year: u16,
    pub dataset: String,
    pub state: String,
    /// Read the API response from this file instead of requesting it.
    pub local_file: Option<PathBuf>,
    pub api_key: Option<String>,
    /// Fill missing values with the column median.
    pub impute_median: bool,
}

impl Default for AcsConfig {
    fn default() -> Self {
        Self {
            base_url: ACS_BASE_URL.to_string(),
            year: 2022,
            dataset: "acs/acs5".to_string(),
            state: "36".to_string(),
            local_file: None,
            api_key: None,
            impute_median: false,
        }
    }
}

impl AcsConfig {
    pub fn url(&self) -> String {
        let mut url = format!("{}/{}/{}?get={POPULATION_VAR},{INCOME_VAR},NAME&for=tract:*&in=state:{}",
            self.base_url.trim_end_matches('/'), self.year, self.dataset, self.state);
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }
        url
    }

    pub(crate) fn source(&self) -> Source {
        match &self.local_file {
            Some(path) => Source::Local(path.clone()),
            None => Source::Remote(self.url()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TractDemographics {
    pub tract: TractId,
    pub total_population: Option<f64>,
    pub median_income: Option<f64>,
}

/// Suppressed or negative estimates (the API's sentinels) become None.
fn estimate(cell: &Value) -> Option<f64> {
    let value = match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parse the API's array-of-arrays response (first row is the header), keeping NYC tracts.
pub fn parse_acs(response: &Value) -> Result<Vec<TractDemographics>> {
    let rows = response.as_array().context("[demographics] response is not a JSON array")?;
    let Some((header, rows)) = rows.split_first() else {
        bail!("[demographics] empty response");
    };
    let header: Vec<&str> = header.as_array()
        .context("[demographics] header row is not an array")?
        .iter()
        .map(|cell| cell.as_str().unwrap_or_default())
        .collect();
    let index = |name: &str| header.iter().position(|h| *h == name)
        .with_context(|| format!("[demographics] response has no {name:?} column"));
    let (population, income, county, tract) = (index(POPULATION_VAR)?, index(INCOME_VAR)?, index("county")?, index("tract")?);

    let mut records = Vec::new();
    let mut other_counties = 0usize;
    for row in rows {
        let Some(row) = row.as_array() else { continue };
        let (Some(county_code), Some(tract_code)) = (row.get(county).and_then(Value::as_str), row.get(tract).and_then(Value::as_str)) else {
            continue;
        };
        let Ok(tract) = TractId::from_county_tract(county_code, tract_code) else {
            other_counties += 1;
            continue;
        };
        records.push(TractDemographics {
            tract,
            total_population: row.get(population).and_then(estimate),
            median_income: row.get(income).and_then(estimate),
        });
    }

    log::debug!("[demographics] {} NYC tracts, {other_counties} rows outside NYC", records.len());
    Ok(records)
}

/// Median of the present values, or None if there are none.
fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut values: Vec<f64> = values.collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 { (values[mid - 1] + values[mid]) / 2.0 } else { values[mid] })
}

/// Replace missing values with each column's median. Returns (population, income) fill counts.
pub fn impute_median(records: &mut [TractDemographics]) -> (usize, usize) {
    fn fill(records: &mut [TractDemographics], field: fn(&mut TractDemographics) -> &mut Option<f64>) -> usize {
        let Some(m) = median(records.iter_mut().filter_map(|r| *field(r))) else { return 0 };
        let mut filled = 0;
        for value in records.iter_mut().map(field).filter(|v| v.is_none()) {
            *value = Some(m);
            filled += 1;
        }
        filled
    }
    (
        fill(records, |r| &mut r.total_population),
        fill(records, |r| &mut r.median_income),
    )
}

/// Missing-value counts per column.
pub fn missing_counts(records: &[TractDemographics]) -> (usize, usize) {
    (
        records.iter().filter(|r| r.total_population.is_none()).count(),
        records.iter().filter(|r| r.median_income.is_none()).count(),
    )
}

/// Tract count per borough, in borough order.
pub fn borough_counts(records: &[TractDemographics]) -> [(Borough, usize); 5] {
    Borough::order().map(|borough| (borough, records.iter().filter(|r| r.tract.borough() == borough).count()))
}

/// Write `tract_id,total_population,median_income`.
pub fn write_demographics(records: &[TractDemographics], path: &Path, force: bool) -> Result<()> {
    let mut df = DataFrame::new(vec![
        Column::new("tract_id".into(), records.iter().map(|r| r.tract.as_str()).collect::<Vec<_>>()),
        Column::new("total_population".into(), records.iter().map(|r| r.total_population).collect::<Vec<_>>()),
        Column::new("median_income".into(), records.iter().map(|r| r.median_income).collect::<Vec<_>>()),
    ])?;
    write_csv(&mut df, path, force)
}

/// Fetch and parse the configured ACS table.
pub(crate) fn fetch(config: &AcsConfig, fetcher: &mut Fetcher) -> Result<Vec<TractDemographics>> {
    let source = config.source();
    log::info!("[demographics] requesting {source}");
    let response = fetcher.read_json(&source)?;
    parse_acs(&response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!([
            ["B01003_001E", "B19013_001E", "NAME", "state", "county", "tract"],
            ["3200", "85000", "Census Tract 1", "36", "061", "000100"],
            ["150", "-666666666", "Census Tract 2", "36", "005", "000200"],
            ["4100", "52000", "Census Tract 3", "36", "047", "000300"],
            ["999", "1", "Census Tract 4", "36", "001", "000100"],
            ["x", "60000", "Census Tract 5", "36", "081", "000400"]
        ])
    }

    #[test]
    fn keeps_nyc_tracts_and_drops_sentinels() {
        let records = parse_acs(&sample()).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].tract.as_str(), "1000100");
        assert_eq!(records[0].total_population, Some(3200.0));
        assert_eq!(records[1].tract.as_str(), "2000200");
        assert_eq!(records[1].median_income, None);
        assert_eq!(records[3].total_population, None);
        assert_eq!(missing_counts(&records), (1, 1));
    }

    #[test]
    fn tracts_are_counted_per_borough() {
        let counts = borough_counts(&parse_acs(&sample()).unwrap());
        assert_eq!(counts[0], (Borough::Manhattan, 1));
        assert_eq!(counts[2], (Borough::Brooklyn, 1));
        assert_eq!(counts[4], (Borough::StatenIsland, 0));
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 4);
    }

    #[test]
    fn median_imputation_fills_gaps() {
        let mut records = parse_acs(&sample()).unwrap();
        assert_eq!(impute_median(&mut records), (1, 1));
        assert_eq!(records[3].total_population, Some(3200.0));
        assert_eq!(records[1].median_income, Some(60000.0));
        assert_eq!(missing_counts(&records), (0, 0));
    }

    #[test]
    fn url_targets_state_tracts() {
        assert_eq!(AcsConfig::default().url(),
            "https://api.census.gov/data/2022/acs/acs5?get=B01003_001E,B19013_001E,NAME&for=tract:*&in=state:36");
    }

    #[test]
    fn missing_header_column_is_an_error() {
        assert!(parse_acs(&json!([["NAME", "county", "tract"]])).is_err());
        assert!(parse_acs(&json!([])).is_err());
    }

    #[test]
    fn writes_blank_for_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demographics.csv");
        write_demographics(&parse_acs(&sample()).unwrap()[..2], &path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(),
            "tract_id,total_population,median_income\n1000100,3200.0,85000.0\n2000200,150.0,\n");
    }
}
