//! Batch stages. Each stage reads earlier outputs from the output directory and writes its
//! own; `Pipeline::run` executes all of them in order.

mod census;
mod demand;
mod geography;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::{common::Fetcher, config::PipelineConfig, layer::Layer, types::TractId};

pub const DEMOGRAPHICS_FILE: &str = "nyc_census_tract_demographics.csv";
pub const NEIGHBORS_CSV_FILE: &str = "nyc_tract_neighbors_1mile.csv";
pub const NEIGHBORS_JSON_FILE: &str = "nyc_tract_neighbors_1mile.json";
pub const CROSSWALK_FILE: &str = "nyc_zone_tract_crosswalk.csv";
pub const COMMUTERS_FILE: &str = "OD_demand_LODES.csv";
pub const COMMUTERS_FILTERED_FILE: &str = "OD_demand_LODES_nonneighbors.csv";
pub const TRIPS_FILE: &str = "OD_demand_TLC.csv";
pub const TRIPS_FILTERED_FILE: &str = "OD_demand_TLC_nonneighbors.csv";
pub const DEMAND_FILE: &str = "Universal_Demand_Map.csv";

/// Attribute names tried, in order, for the tract id of a tract layer.
pub const TRACT_ID_FIELDS: [&str; 2] = ["BoroCT2020", "GEOID"];
/// Attribute name of the taxi zone id.
pub const ZONE_ID_FIELD: &str = "LocationID";

/// Configuration plus where stage files live.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    output_dir: PathBuf,
    force: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self { config, output_dir: output_dir.into(), force: false }
    }

    /// Allow stages to overwrite existing outputs.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[inline] pub fn config(&self) -> &PipelineConfig { &self.config }
    #[inline] pub fn output_dir(&self) -> &Path { &self.output_dir }

    /// Path of a stage file in the output directory.
    #[inline] pub fn output(&self, file_name: &str) -> PathBuf { self.output_dir.join(file_name) }

    fn fetcher(&self) -> Result<Fetcher> {
        Fetcher::new(self.config.http_timeout())
    }

    /// Every stage, in dependency order.
    pub fn run(&self, tracts: &Path, zones: &Path) -> Result<()> {
        // Nothing downstream reads the demographics table.
        if let Err(e) = self.demographics() {
            log::warn!("[run] demographics skipped: {e:#}");
        }
        self.neighbors(tracts)?;
        self.crosswalk(zones, tracts)?;
        self.commuters()?;
        self.trips()?;
        self.fuse()?;
        self.distance(tracts)?;
        log::info!("[run] all stages finished; outputs in {}", self.output_dir.display());
        Ok(())
    }
}

/// Read a tract layer, normalize its ids, merge shapes sharing an id, and project it into
/// the working planar CRS.
pub(crate) fn load_tracts(path: &Path) -> Result<Layer<TractId>> {
    let (tracts, skipped) = Layer::read(path, &TRACT_ID_FIELDS)?.into_tracts();
    if skipped > 0 {
        log::warn!("[layer] skipped {skipped} tracts with unusable ids in {}", path.display());
    }
    let shapes = tracts.len();
    let tracts = tracts.dissolve();
    log::info!("[layer] {} tracts ({shapes} shapes) from {}", tracts.len(), path.display());
    tracts.to_planar()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(id: &str, x: f64, width: f64) -> serde_json::Value {
        let (y, top) = (200000.0, 201000.0);
        json!({
            "type": "Feature",
            "properties": { "BoroCT2020": id },
            "geometry": { "type": "Polygon", "coordinates": [[[x, y], [x + width, y], [x + width, top], [x, top], [x, y]]] },
        })
    }

    #[test]
    fn split_tracts_are_merged_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracts.geojson");
        let layer = json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::2263" } },
            "features": [
                feature("1000100", 980000.0, 500.0),
                feature("1000200", 990000.0, 1000.0),
                feature("1000100", 980500.0, 500.0),
            ],
        });
        std::fs::write(&path, serde_json::to_vec(&layer).unwrap()).unwrap();

        let tracts = load_tracts(&path).unwrap();
        assert_eq!(tracts.ids().iter().map(TractId::as_str).collect::<Vec<_>>(), vec!["1000100", "1000200"]);

        // Both halves contribute to the merged tract's centroid.
        let centroids = tracts.centroids_lonlat().unwrap();
        let (merged, other) = (centroids[0].unwrap(), centroids[1].unwrap());
        let gap_ft = 1000.0 * crate::fusion::haversine_km(merged, other) / 0.3048;
        assert!((gap_ft - 10000.0).abs() < 50.0, "{gap_ft}");
    }
}
