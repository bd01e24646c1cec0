//! Commuter demand: LODES home/work block pairs, summed per tract pair across years.

use std::{io::Read, path::PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;

use crate::{common::{Fetcher, Source}, od::OdMatrix, types::TractId};

pub const LODES_BASE_URL: &str = "https://lehd.ces.census.gov/data/lodes/LODES8";

/// Which LODES archives to read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LodesConfig {
    pub base_url: String,
    /// Read `{state}_od_main_{job_type}_{year}.csv.gz` from this directory instead of downloading.
    pub local_dir: Option<PathBuf>,
    pub state: String,
    pub job_type: String,
    pub years: Vec<u16>,
}

impl Default for LodesConfig {
    fn default() -> Self {
        Self {
            base_url: LODES_BASE_URL.to_string(),
            local_dir: None,
            state: "ny".to_string(),
            job_type: "JT00".to_string(),
            years: vec![2020, 2021, 2022],
        }
    }
}

impl LodesConfig {
    pub fn file_name(&self, year: u16) -> String {
        format!("{}_od_main_{}_{year}.csv.gz", self.state, self.job_type)
    }

    pub(crate) fn source(&self, year: u16) -> Source {
        let file_name = self.file_name(year);
        let url = format!("{}/{}/od/{file_name}", self.base_url.trim_end_matches('/'), self.state);
        Source::resolve(self.local_dir.as_deref(), &file_name, url)
    }
}

/// The columns of an OD main record used here; the rest are ignored.
#[derive(Debug, Deserialize)]
struct OdRecord {
    h_geocode: String,
    w_geocode: String,
    #[serde(rename = "S000")]
    s000: String,
}

/// Tract of a 15-digit census block geocode, if it lies in one of the five NYC counties.
pub fn block_to_tract(geocode: &str) -> Option<TractId> {
    let geocode = geocode.trim();
    if geocode.len() != 15 || !geocode.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    TractId::from_county_tract(&geocode[..5], &geocode[5..11]).ok()
}

/// Job count cell; anything non-numeric counts as 0.
#[inline]
fn job_count(cell: &str) -> f64 {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Counts from reading one year's archive.
#[derive(Debug, Default)]
pub struct YearCounts {
    pub matrix: OdMatrix,
    pub records: usize,
    pub kept: usize,
}

/// Stream an OD main CSV (plain text) record by record, keeping flows with both ends
/// in NYC. Origin is the home tract, destination the work tract.
pub fn read_od_main(reader: impl Read) -> Result<YearCounts> {
    let mut counts = YearCounts::default();
    let mut csv = csv::Reader::from_reader(reader);
    for record in csv.deserialize::<OdRecord>() {
        let record = record.context("[commuters] Failed to parse OD record")?;
        counts.records += 1;
        let (Some(home), Some(work)) = (block_to_tract(&record.h_geocode), block_to_tract(&record.w_geocode)) else {
            continue;
        };
        counts.kept += 1;
        counts.matrix.add(home, work, job_count(&record.s000));
    }
    Ok(counts)
}

/// Result of reading every configured year.
#[derive(Debug, Default)]
pub struct CommutersOutcome {
    pub matrix: OdMatrix,
    pub years_ok: usize,
    pub years_failed: usize,
    pub bytes_downloaded: u64,
}

/// Read each year's gzip archive and sum the flows. A year that fails part way is
/// discarded whole, logged, and skipped.
pub(crate) fn aggregate(config: &LodesConfig, fetcher: &mut Fetcher) -> Result<CommutersOutcome> {
    if config.years.is_empty() {
        bail!("[commuters] no years configured");
    }

    let mut outcome = CommutersOutcome::default();
    for year in &config.years {
        let source = config.source(*year);
        log::info!("[commuters] loading {year} from {source}");
        let counted = fetcher.open(&source)
            .and_then(|reader| read_od_main(GzDecoder::new(reader)))
            .with_context(|| format!("processing {source}"));
        match counted {
            Ok(year_counts) => {
                log::info!("[commuters] {year}: {} of {} records within NYC, {} tract pairs",
                    year_counts.kept, year_counts.records, year_counts.matrix.len());
                outcome.matrix.merge(year_counts.matrix);
                outcome.years_ok += 1;
            }
            Err(e) => {
                log::warn!("[commuters] skipping {year}: {e:#}");
                outcome.years_failed += 1;
            }
        }
    }
    outcome.bytes_downloaded = fetcher.bytes_downloaded();
    Ok(outcome)
}
