use anyhow::{bail, Result};

use crate::{
    adjacency::AdjacencyMap,
    crosswalk::Crosswalk,
    fusion::{complete_cross_product, fuse, overlap, DemandRow, OverlapSummary},
    od::{FilterStats, OdColumns, OdMatrix},
    sources::{commuters, trips},
};

use super::{
    Pipeline, COMMUTERS_FILE, COMMUTERS_FILTERED_FILE, CROSSWALK_FILE, DEMAND_FILE,
    NEIGHBORS_CSV_FILE, TRIPS_FILE, TRIPS_FILTERED_FILE,
};

/// Decimal places kept for apportioned trip totals.
const TRIP_DECIMALS: i32 = 4;

impl Pipeline {
    /// Commuter flows summed over the configured years, raw and with near pairs removed.
    pub fn commuters(&self) -> Result<FilterStats> {
        let neighbors = AdjacencyMap::read_csv(&self.output(NEIGHBORS_CSV_FILE))?;
        let mut fetcher = self.fetcher()?;

        let outcome = commuters::aggregate(&self.config().lodes, &mut fetcher)?;
        log::info!("[commuters] {} of {} years loaded, {:.3} GB downloaded",
            outcome.years_ok, outcome.years_ok + outcome.years_failed,
            outcome.bytes_downloaded as f64 / 1024f64.powi(3));
        if outcome.years_ok == 0 {
            bail!("[commuters] no year could be read");
        }

        self.write_filtered(outcome.matrix, &neighbors, OdColumns::COMMUTERS, None,
            COMMUTERS_FILE, COMMUTERS_FILTERED_FILE, "commuters")
    }

    /// Taxi trips apportioned onto tract pairs, raw and with near pairs removed.
    pub fn trips(&self) -> Result<FilterStats> {
        let crosswalk = Crosswalk::read_csv(&self.output(CROSSWALK_FILE))?;
        let neighbors = AdjacencyMap::read_csv(&self.output(NEIGHBORS_CSV_FILE))?;
        let mut fetcher = self.fetcher()?;

        let outcome = trips::aggregate(&self.config().tlc, &crosswalk, &mut fetcher)?;
        log::info!("[trips] {} of {} months loaded, {} qualifying trips, {:.3} GB downloaded",
            outcome.months_ok, outcome.months_ok + outcome.months_failed, outcome.trips_counted,
            fetcher.bytes_downloaded() as f64 / 1024f64.powi(3));
        if outcome.months_ok == 0 {
            bail!("[trips] no month could be read");
        }

        self.write_filtered(outcome.matrix, &neighbors, OdColumns::TRIPS, Some(TRIP_DECIMALS),
            TRIPS_FILE, TRIPS_FILTERED_FILE, "trips")
    }

    /// Write the raw table, drop self and neighbor pairs, write the sorted filtered table.
    #[allow(clippy::too_many_arguments)]
    fn write_filtered(
        &self,
        mut matrix: OdMatrix,
        neighbors: &AdjacencyMap,
        columns: OdColumns,
        decimals: Option<i32>,
        raw_file: &str,
        filtered_file: &str,
        stage: &str,
    ) -> Result<FilterStats> {
        matrix.write_csv(&self.output(raw_file), columns, decimals, self.force)?;
        log::info!("[{stage}] wrote {raw_file} with {} pairs", matrix.len());

        let stats = matrix.filter_pairs(neighbors);
        log::info!("[{stage}] {stats}");
        matrix.write_csv(&self.output(filtered_file), columns, decimals, self.force)?;
        log::info!("[{stage}] wrote {filtered_file}");
        Ok(stats)
    }

    /// Fuse the filtered trip and commuter tables into the universal demand map.
    pub fn fuse(&self) -> Result<OverlapSummary> {
        let settings = &self.config().fusion;
        let trips = OdMatrix::read_csv(&self.output(TRIPS_FILTERED_FILE), OdColumns::TRIPS)?;
        let commuters = OdMatrix::read_csv(&self.output(COMMUTERS_FILTERED_FILE), OdColumns::COMMUTERS)?;
        log::info!("[fuse] {} trip pairs, {} commuter pairs", trips.len(), commuters.len());
        if let (Some(t), Some(c)) = (trips.max(), commuters.max()) {
            if c > 0.0 {
                log::info!("[fuse] scale ratio (trips max / commuters max): {:.1}x", t / c);
            }
        }

        let mut rows = fuse(&trips, &commuters, settings.weights);
        let summary = overlap(&rows);
        log::info!("[fuse] {summary}");

        if settings.complete_cross_product {
            let added = complete_cross_product(&mut rows);
            log::info!("[fuse] added {added} zero rows to complete origin × destination pairs");
        }

        DemandRow::write_csv(&rows, &self.output(DEMAND_FILE), self.force)?;
        log::info!("[fuse] wrote {DEMAND_FILE} with {} rows", rows.len());
        Ok(summary)
    }
}
