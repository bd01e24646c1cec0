use std::{collections::BTreeMap, fmt};

use anyhow::{ensure, Result};

use crate::{layer::Layer, types::{TractId, ZoneId}};

/// How many zones map onto few tracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Simplicity {
    pub threshold: usize,
    pub simple: usize,
    pub total: usize,
}

impl Simplicity {
    #[inline] pub fn complex(&self) -> usize { self.total - self.simple }

    pub fn percent_simple(&self) -> f64 {
        if self.total == 0 { 0.0 } else { 100.0 * self.simple as f64 / self.total as f64 }
    }
}

impl fmt::Display for Simplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} zones ({:.1}%) overlap at most {} tracts; {} overlap more",
            self.simple, self.total, self.percent_simple(), self.threshold, self.complex())
    }
}

/// Area-weighted assignment of taxi zones onto census tracts.
/// Every zone present has weights summing to 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crosswalk {
    pub(super) zones: BTreeMap<ZoneId, Vec<(TractId, f64)>>,
}

impl Crosswalk {
    /// Overlay zone shapes onto tract shapes (both in the same planar CRS), weighting each
    /// (zone, tract) pair by the share of the zone's area it covers.
    pub fn build(zones: &Layer<ZoneId>, tracts: &Layer<TractId>, threshold: f64) -> Result<Self> {
        ensure!(zones.crs() == tracts.crs(),
            "[crosswalk] zones are in EPSG:{} but tracts are in EPSG:{}", zones.crs().epsg(), tracts.crs().epsg());
        ensure!(!zones.crs().is_geographic(), "[crosswalk] overlay needs a planar CRS");

        let areas = zones.geoms().areas();
        for (zone, _) in zones.ids().iter().zip(&areas).filter(|(_, area)| **area <= 0.0) {
            log::warn!("[crosswalk] zone {zone} has zero area; skipped");
        }

        let rows = zones.geoms().intersection_areas(tracts.geoms()).into_iter()
            .filter(|piece| areas[piece.source] > 0.0)
            .map(|piece| (
                zones.ids()[piece.source],
                tracts.ids()[piece.target].clone(),
                piece.area / areas[piece.source],
            ));
        Ok(Self::from_overlay(rows, threshold))
    }

    /// Sum raw (zone, tract, weight) rows per pair, drop pairs below `threshold`,
    /// and rescale each zone's surviving weights to sum to 1.
    pub fn from_overlay(rows: impl IntoIterator<Item = (ZoneId, TractId, f64)>, threshold: f64) -> Self {
        let mut raw: BTreeMap<ZoneId, BTreeMap<TractId, f64>> = BTreeMap::new();
        for (zone, tract, weight) in rows {
            *raw.entry(zone).or_default().entry(tract).or_insert(0.0) += weight;
        }

        let mut zones = BTreeMap::new();
        let mut dropped_rows = 0usize;
        for (zone, tracts) in raw {
            let before = tracts.len();
            let kept: Vec<(TractId, f64)> = tracts.into_iter()
                .filter(|(_, weight)| *weight >= threshold)
                .collect();
            dropped_rows += before - kept.len();

            let sum: f64 = kept.iter().map(|(_, w)| w).sum();
            if kept.is_empty() || sum <= 0.0 {
                log::warn!("[crosswalk] zone {zone} has no overlap above {threshold}; dropped");
                continue;
            }
            zones.insert(zone, kept.into_iter().map(|(tract, w)| (tract, w / sum)).collect());
        }

        log::debug!("[crosswalk] dropped {dropped_rows} overlaps below {threshold}");
        Self { zones }
    }

    /// Number of zones.
    #[inline] pub fn len(&self) -> usize { self.zones.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.zones.is_empty() }

    /// Number of (zone, tract) rows.
    pub fn rows(&self) -> usize { self.zones.values().map(Vec::len).sum() }

    /// Tracts and weights for a zone (empty if the zone is absent).
    #[inline]
    pub fn weights_for(&self, zone: ZoneId) -> &[(TractId, f64)] {
        self.zones.get(&zone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ZoneId, &[(TractId, f64)])> {
        self.zones.iter().map(|(zone, weights)| (*zone, weights.as_slice()))
    }

    /// Sum of weights per zone.
    pub fn weight_sums(&self) -> Vec<(ZoneId, f64)> {
        self.iter().map(|(zone, weights)| (zone, weights.iter().map(|(_, w)| w).sum())).collect()
    }

    /// Fail if any zone's weights do not sum to 1 within `tolerance`.
    pub fn validate(&self, tolerance: f64) -> Result<()> {
        for (zone, sum) in self.weight_sums() {
            ensure!((sum - 1.0).abs() <= tolerance,
                "[crosswalk] weights for zone {zone} sum to {sum:.6}, not 1");
        }
        Ok(())
    }

    /// Count zones overlapping at most `threshold` tracts.
    pub fn simplicity(&self, threshold: usize) -> Simplicity {
        Simplicity {
            threshold,
            simple: self.zones.values().filter(|weights| weights.len() <= threshold).count(),
            total: self.zones.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{square, Crs, Geometries};

    fn t(code: &str) -> TractId { TractId::new(code).unwrap() }

    #[test]
    fn small_weights_are_dropped_and_rest_renormalized() {
        let zone = ZoneId(4);
        let cw = Crosswalk::from_overlay([
            (zone, t("1000100"), 0.004),
            (zone, t("1000200"), 0.5),
            (zone, t("1000300"), 0.496),
        ], 0.01);

        let weights = cw.weights_for(zone);
        assert_eq!(weights.len(), 2);
        assert!((weights[0].1 - 0.5 / 0.996).abs() < 1e-12);
        assert!((weights[1].1 - 0.496 / 0.996).abs() < 1e-12);
        assert!((weights[0].1 - 0.502).abs() < 1e-3);
        cw.validate(1e-6).unwrap();
    }

    #[test]
    fn zone_without_surviving_weights_disappears() {
        let cw = Crosswalk::from_overlay([
            (ZoneId(1), t("1000100"), 0.005),
            (ZoneId(2), t("1000100"), 1.0),
        ], 0.01);
        assert!(cw.weights_for(ZoneId(1)).is_empty());
        assert_eq!(cw.len(), 1);
        assert_eq!(cw.rows(), 1);
    }

    #[test]
    fn pieces_of_the_same_pair_are_summed() {
        let cw = Crosswalk::from_overlay([
            (ZoneId(1), t("1000100"), 0.006),
            (ZoneId(1), t("1000100"), 0.006),
            (ZoneId(1), t("1000200"), 0.988),
        ], 0.01);
        assert_eq!(cw.weights_for(ZoneId(1)).len(), 2);
    }

    #[test]
    fn validate_catches_bad_sums() {
        let mut cw = Crosswalk::from_overlay([(ZoneId(1), t("1000100"), 1.0)], 0.01);
        cw.zones.insert(ZoneId(2), vec![(t("1000100"), 0.7)]);
        assert!(cw.validate(1e-6).is_err());
    }

    #[test]
    fn simplicity_counts_zones_at_or_below_threshold() {
        let rows = (0..12).map(|i| (ZoneId(1), t(&format!("10001{i:02}")), 1.0 / 12.0))
            .chain([(ZoneId(2), t("2000100"), 1.0)]);
        let summary = Crosswalk::from_overlay(rows, 0.01).simplicity(10);
        assert_eq!((summary.simple, summary.total, summary.complex()), (1, 2, 1));
        assert!((summary.percent_simple() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn build_from_overlapping_squares() {
        let zones = Layer::new(vec![ZoneId(1), ZoneId(2)], Geometries::new(vec![
            square(0.0, 0.0, 100.0),
            square(500.0, 500.0, 0.0),
        ], Crs::NyLongIsland));
        let tracts = Layer::new(vec![t("1000100"), t("1000200"), t("1000300")], Geometries::new(vec![
            square(-50.0, 0.0, 100.0),   // left half of zone 1
            square(50.0, 0.0, 99.5),     // right half, minus a sliver
            square(0.0, 99.5, 100.0),    // 0.5% sliver along the top
        ], Crs::NyLongIsland));

        let cw = Crosswalk::build(&zones, &tracts, 0.01).unwrap();
        assert_eq!(cw.len(), 1);
        let weights = cw.weights_for(ZoneId(1));
        assert_eq!(weights.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>(), vec!["1000100", "1000200"]);
        cw.validate(1e-9).unwrap();
    }
}
