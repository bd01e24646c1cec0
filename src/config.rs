use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    adjacency::SymmetryPolicy,
    fusion::FusionWeights,
    sources::{commuters::LodesConfig, demographics::AcsConfig, trips::TlcConfig},
};

/// Tunables for every stage, loaded from an optional TOML file.
/// Missing keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub neighbors: NeighborsConfig,
    pub crosswalk: CrosswalkConfig,
    pub lodes: LodesConfig,
    pub tlc: TlcConfig,
    pub acs: AcsConfig,
    pub fusion: FusionConfig,
    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            neighbors: NeighborsConfig::default(),
            crosswalk: CrosswalkConfig::default(),
            lodes: LodesConfig::default(),
            tlc: TlcConfig::default(),
            acs: AcsConfig::default(),
            fusion: FusionConfig::default(),
            http_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NeighborsConfig {
    /// Buffer distance in feet (EPSG:2263 units).
    pub distance_ft: f64,
    pub symmetry: SymmetryPolicy,
}

impl Default for NeighborsConfig {
    fn default() -> Self {
        Self { distance_ft: 5280.0, symmetry: SymmetryPolicy::Union }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CrosswalkConfig {
    /// Overlaps covering less than this share of a zone are dropped.
    pub min_weight: f64,
    /// Zones overlapping at most this many tracts count as simple.
    pub simplicity_threshold: usize,
    pub tolerance: f64,
}

impl Default for CrosswalkConfig {
    fn default() -> Self {
        Self { min_weight: 0.01, simplicity_threshold: 10, tolerance: 1e-6 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub weights: FusionWeights,
    /// Add zero rows for every origin × destination pair missing from the map.
    pub complete_cross_product: bool,
}

impl PipelineConfig {
    /// Load from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else { return Ok(Self::default()) };
        let text = fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("[config] Invalid configuration in {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    #[inline] pub fn http_timeout(&self) -> Duration { Duration::from_secs(self.http_timeout_secs) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::trips::Month;

    #[test]
    fn empty_file_gives_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.neighbors.distance_ft, 5280.0);
        assert_eq!(config.crosswalk.min_weight, 0.01);
        assert_eq!(config.lodes.years, vec![2020, 2021, 2022]);
        assert_eq!(config.tlc.filter.min_fare, 2.5);
        assert_eq!(config.fusion.weights, FusionWeights { trips: 0.5, commuters: 0.5 });
    }

    #[test]
    fn partial_sections_override_only_their_keys() {
        let config = PipelineConfig::from_toml(r#"
            http_timeout_secs = 30

            [neighbors]
            symmetry = "as-detected"

            [tlc]
            start = "2023-01"
            end = "2023-03"

            [tlc.filter]
            min_distance_miles = 1.0

            [fusion]
            complete_cross_product = true
            weights = { trips = 0.7, commuters = 0.3 }
        "#).unwrap();

        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.neighbors.symmetry, SymmetryPolicy::AsDetected);
        assert_eq!(config.neighbors.distance_ft, 5280.0);
        assert_eq!(config.tlc.start, Month { year: 2023, month: 1 });
        assert_eq!(config.tlc.filter.min_distance_miles, 1.0);
        assert_eq!(config.tlc.filter.max_duration_minutes, 240.0);
        assert!(config.fusion.complete_cross_product);
        assert_eq!(config.fusion.weights.trips, 0.7);
    }

    #[test]
    fn unknown_keys_and_bad_months_are_rejected() {
        assert!(PipelineConfig::from_toml("neighbours = 1").is_err());
        assert!(PipelineConfig::from_toml("[tlc]\nstart = \"2023-13\"").is_err());
    }
}
