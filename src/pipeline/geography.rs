use std::path::Path;

use ahash::AHashMap;
use anyhow::Result;

use crate::{
    adjacency::{AdjacencyMap, AdjacencyStats},
    crosswalk::{Crosswalk, Simplicity},
    fusion::{attach_distances, DemandRow},
    layer::Layer,
};

use super::{load_tracts, Pipeline, CROSSWALK_FILE, DEMAND_FILE, NEIGHBORS_CSV_FILE, NEIGHBORS_JSON_FILE, ZONE_ID_FIELD};

impl Pipeline {
    /// Tract adjacency within the buffer distance, written as CSV and JSON.
    pub fn neighbors(&self, tracts: &Path) -> Result<AdjacencyStats> {
        let settings = &self.config().neighbors;
        let tracts = load_tracts(tracts)?;

        log::info!("[neighbors] finding tracts within {} ft ({:?} symmetry)", settings.distance_ft, settings.symmetry);
        let map = AdjacencyMap::build(&tracts, settings.distance_ft, settings.symmetry);
        let stats = map.stats();
        log::info!("[neighbors] {stats}");

        map.write_csv(&self.output(NEIGHBORS_CSV_FILE), self.force)?;
        map.write_json(&self.output(NEIGHBORS_JSON_FILE), self.force)?;
        log::info!("[neighbors] wrote {} and {}", NEIGHBORS_CSV_FILE, NEIGHBORS_JSON_FILE);
        Ok(stats)
    }

    /// Area-weighted zone → tract crosswalk.
    pub fn crosswalk(&self, zones: &Path, tracts: &Path) -> Result<Simplicity> {
        let settings = &self.config().crosswalk;

        let (zones_layer, skipped) = Layer::read(zones, &[ZONE_ID_FIELD])?.into_zones();
        if skipped > 0 {
            log::warn!("[crosswalk] skipped {skipped} zone shapes with a LocationID outside 1..=263");
        }
        let raw_count = zones_layer.len();
        let zones_layer = zones_layer.dissolve().to_planar()?;
        log::info!("[crosswalk] {} zone shapes dissolved into {} zones", raw_count, zones_layer.len());

        let tracts = load_tracts(tracts)?;
        let crosswalk = Crosswalk::build(&zones_layer, &tracts, settings.min_weight)?;
        crosswalk.validate(settings.tolerance)?;
        log::info!("[crosswalk] {} zones mapped onto tracts with {} rows", crosswalk.len(), crosswalk.rows());

        crosswalk.write_csv(&self.output(CROSSWALK_FILE), self.force)?;
        log::info!("[crosswalk] wrote {CROSSWALK_FILE}");

        let simplicity = crosswalk.simplicity(settings.simplicity_threshold);
        log::info!("[crosswalk] {simplicity}");
        Ok(simplicity)
    }

    /// Fill in centroid distances on the universal demand map, rewriting it in place.
    /// Returns the number of rows whose distance stays unknown.
    pub fn distance(&self, tracts: &Path) -> Result<usize> {
        let path = self.output(DEMAND_FILE);
        let mut rows = DemandRow::read_csv(&path)?;

        let tracts = load_tracts(tracts)?;
        let centroids: AHashMap<_, _> = tracts.ids().iter().cloned()
            .zip(tracts.centroids_lonlat()?)
            .filter_map(|(id, centroid)| centroid.map(|c| (id, c)))
            .collect();

        let missing = attach_distances(&mut rows, &centroids);
        if missing > 0 {
            log::warn!("[distance] {missing} of {} pairs have no centroid for one end", rows.len());
        }

        DemandRow::write_csv(&rows, &path, true)?;
        log::info!("[distance] added distance_km to {} rows of {DEMAND_FILE}", rows.len() - missing);
        Ok(missing)
    }
}
