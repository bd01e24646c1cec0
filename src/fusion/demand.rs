use std::{cmp::Ordering, collections::BTreeSet, fmt};

use ahash::{AHashMap, AHashSet};
use serde::Deserialize;

use crate::{od::OdMatrix, types::TractId};

/// One row of the universal demand map.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandRow {
    pub origin: TractId,
    pub destination: TractId,
    pub norm_trips: f64,
    pub norm_commuters: f64,
    pub universal_demand: f64,
    pub distance_km: Option<f64>,
}

/// Weights applied to the two normalized sources.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub trips: f64,
    pub commuters: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { trips: 0.5, commuters: 0.5 }
    }
}

/// Scale every value by the matrix maximum, so the largest becomes 1.
/// A matrix whose maximum is not positive normalizes to all zeros.
pub fn normalize(matrix: &OdMatrix) -> OdMatrix {
    let max = matrix.max().unwrap_or(0.0);
    let mut normalized = OdMatrix::new();
    for (origin, destination, value) in matrix.iter() {
        let scaled = if max > 0.0 { value / max } else { 0.0 };
        normalized.add(origin.clone(), destination.clone(), scaled);
    }
    normalized
}

/// Outer-join the normalized sources on (origin, destination). A pair missing from one
/// source takes 0 from it. Rows are returned largest universal demand first.
pub fn fuse(trips: &OdMatrix, commuters: &OdMatrix, weights: FusionWeights) -> Vec<DemandRow> {
    let mut joined: AHashMap<(TractId, TractId), (f64, f64)> = AHashMap::with_capacity(trips.len() + commuters.len());
    for (origin, destination, value) in normalize(trips).iter() {
        joined.entry((origin.clone(), destination.clone())).or_default().0 = value;
    }
    for (origin, destination, value) in normalize(commuters).iter() {
        joined.entry((origin.clone(), destination.clone())).or_default().1 = value;
    }

    let mut rows: Vec<DemandRow> = joined.into_iter()
        .map(|((origin, destination), (norm_trips, norm_commuters))| DemandRow {
            origin,
            destination,
            norm_trips,
            norm_commuters,
            universal_demand: weights.trips * norm_trips + weights.commuters * norm_commuters,
            distance_km: None,
        })
        .collect();
    sort_desc(&mut rows);
    rows
}

/// Largest universal demand first; ties ordered by origin then destination.
pub(crate) fn sort_desc(rows: &mut [DemandRow]) {
    rows.sort_by(|a, b| b.universal_demand.partial_cmp(&a.universal_demand).unwrap_or(Ordering::Equal)
        .then_with(|| a.origin.cmp(&b.origin))
        .then_with(|| a.destination.cmp(&b.destination)));
}

/// How the two sources overlap across the fused pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlapSummary {
    pub total: usize,
    pub both: usize,
    pub trips_only: usize,
    pub commuters_only: usize,
    /// Share of summed normalized demand over shared pairs coming from trips, in percent.
    pub trips_share: f64,
    pub commuters_share: f64,
    /// Shared pairs where one source's normalized value is larger.
    pub trips_dominant: usize,
    pub commuters_dominant: usize,
}

impl fmt::Display for OverlapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = |n: usize| if self.total == 0 { 0.0 } else { 100.0 * n as f64 / self.total as f64 };
        write!(f, "{} pairs: {} shared ({:.2}%), {} trips only ({:.2}%), {} commuters only ({:.2}%); \
            shared demand {:.2}% trips / {:.2}% commuters",
            self.total, self.both, pct(self.both), self.trips_only, pct(self.trips_only),
            self.commuters_only, pct(self.commuters_only), self.trips_share, self.commuters_share)
    }
}

pub fn overlap(rows: &[DemandRow]) -> OverlapSummary {
    let mut summary = OverlapSummary { total: rows.len(), ..Default::default() };
    let (mut trips_sum, mut commuters_sum) = (0.0, 0.0);
    for row in rows {
        match (row.norm_trips > 0.0, row.norm_commuters > 0.0) {
            (true, true) => {
                summary.both += 1;
                trips_sum += row.norm_trips;
                commuters_sum += row.norm_commuters;
                match row.norm_trips.partial_cmp(&row.norm_commuters) {
                    Some(Ordering::Greater) => summary.trips_dominant += 1,
                    Some(Ordering::Less) => summary.commuters_dominant += 1,
                    _ => {}
                }
            }
            (true, false) => summary.trips_only += 1,
            (false, true) => summary.commuters_only += 1,
            (false, false) => {}
        }
    }
    let shared = trips_sum + commuters_sum;
    if shared > 0.0 {
        summary.trips_share = 100.0 * trips_sum / shared;
        summary.commuters_share = 100.0 * commuters_sum / shared;
    }
    summary
}

/// Add a zero row for every (origin, destination) combination of the distinct origins
/// and destinations that is missing from `rows`. Returns the number of rows added.
pub fn complete_cross_product(rows: &mut Vec<DemandRow>) -> usize {
    let origins: BTreeSet<TractId> = rows.iter().map(|r| r.origin.clone()).collect();
    let destinations: BTreeSet<TractId> = rows.iter().map(|r| r.destination.clone()).collect();
    let present: AHashSet<(TractId, TractId)> = rows.iter()
        .map(|r| (r.origin.clone(), r.destination.clone()))
        .collect();

    let before = rows.len();
    for origin in &origins {
        for destination in &destinations {
            if !present.contains(&(origin.clone(), destination.clone())) {
                rows.push(DemandRow {
                    origin: origin.clone(),
                    destination: destination.clone(),
                    norm_trips: 0.0,
                    norm_commuters: 0.0,
                    universal_demand: 0.0,
                    distance_km: None,
                });
            }
        }
    }
    sort_desc(rows);
    rows.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::od::OdRow;

    fn t(code: &str) -> TractId { TractId::new(code).unwrap() }

    fn matrix(rows: &[(&str, &str, f64)]) -> OdMatrix {
        rows.iter().map(|(o, d, v)| OdRow { origin: t(o), destination: t(d), value: *v }).collect()
    }

    #[test]
    fn normalize_scales_to_unit_max() {
        let norm = normalize(&matrix(&[("1000100", "1000200", 50.0), ("1000100", "1000300", 200.0)]));
        assert_eq!(norm.max(), Some(1.0));
        assert_eq!(norm.get(&t("1000100"), &t("1000200")), Some(0.25));
    }

    #[test]
    fn normalize_zero_max_gives_zeros() {
        let norm = normalize(&matrix(&[("1000100", "1000200", 0.0), ("1000100", "1000300", -1.0)]));
        assert!(norm.iter().all(|(_, _, v)| v == 0.0));
        assert_eq!(norm.len(), 2);
    }

    #[test]
    fn single_source_pairs_get_half_weight() {
        let trips = matrix(&[("1000100", "1000200", 100.0), ("1000100", "1000300", 50.0)]);
        let commuters = matrix(&[("1000100", "1000300", 10.0), ("2000100", "1000100", 5.0)]);
        let rows = fuse(&trips, &commuters, FusionWeights::default());

        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].origin.as_str(), rows[0].destination.as_str()), ("1000100", "1000300"));
        assert!((rows[0].universal_demand - 0.75).abs() < 1e-12);
        assert_eq!(rows[1].universal_demand, 0.5);
        assert_eq!(rows[1].norm_commuters, 0.0);
        assert!((rows[2].universal_demand - 0.25).abs() < 1e-12);
        assert_eq!(rows[2].norm_trips, 0.0);
    }

    #[test]
    fn overlap_counts_sources() {
        let trips = matrix(&[("1000100", "1000200", 100.0), ("1000100", "1000300", 50.0)]);
        let commuters = matrix(&[("1000100", "1000300", 10.0), ("2000100", "1000100", 5.0)]);
        let summary = overlap(&fuse(&trips, &commuters, FusionWeights::default()));

        assert_eq!((summary.total, summary.both, summary.trips_only, summary.commuters_only), (3, 1, 1, 1));
        assert_eq!(summary.commuters_dominant, 1);
        assert!((summary.trips_share - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn cross_product_fills_missing_pairs_with_zeros() {
        let trips = matrix(&[("1000100", "1000200", 4.0), ("1000300", "1000400", 2.0)]);
        let mut rows = fuse(&trips, &OdMatrix::new(), FusionWeights::default());

        assert_eq!(complete_cross_product(&mut rows), 2);
        assert_eq!(rows.len(), 4);
        assert!(rows[2..].iter().all(|r| r.universal_demand == 0.0 && r.distance_km.is_none()));
        assert_eq!((rows[2].origin.as_str(), rows[2].destination.as_str()), ("1000100", "1000400"));
        assert_eq!(complete_cross_product(&mut rows), 0);
    }
}
