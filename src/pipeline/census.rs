use anyhow::{ensure, Result};

use crate::sources::demographics::{self, TractDemographics};

use super::{Pipeline, DEMOGRAPHICS_FILE};

impl Pipeline {
    /// Tract population and income from the ACS API.
    pub fn demographics(&self) -> Result<Vec<TractDemographics>> {
        let settings = &self.config().acs;
        let mut fetcher = self.fetcher()?;

        let mut records = demographics::fetch(settings, &mut fetcher)?;
        ensure!(!records.is_empty(), "[demographics] response has no NYC tracts");

        let (population, income) = demographics::missing_counts(&records);
        log::info!("[demographics] {} tracts; missing population {population}, missing income {income}", records.len());
        for (borough, count) in demographics::borough_counts(&records) {
            log::debug!("[demographics] {}: {count} tracts", borough.to_str());
        }
        if settings.impute_median {
            let (population, income) = demographics::impute_median(&mut records);
            log::info!("[demographics] imputed {population} population and {income} income values with the median");
        }

        demographics::write_demographics(&records, &self.output(DEMOGRAPHICS_FILE), self.force)?;
        log::info!("[demographics] wrote {DEMOGRAPHICS_FILE}");
        Ok(records)
    }
}
