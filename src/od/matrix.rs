use std::{cmp::Ordering, fmt};

use ahash::AHashMap;

use crate::{adjacency::AdjacencyMap, types::TractId};

/// One origin-destination pair and its volume.
#[derive(Debug, Clone, PartialEq)]
pub struct OdRow {
    pub origin: TractId,
    pub destination: TractId,
    pub value: f64,
}

/// Rows removed by `OdMatrix::filter_pairs`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterStats {
    pub removed_self: usize,
    pub removed_neighbor: usize,
    pub kept: usize,
    pub removed_volume: f64,
    pub total_volume: f64,
}

impl FilterStats {
    /// Share of the volume removed, in percent.
    pub fn removed_percent(&self) -> f64 {
        if self.total_volume > 0.0 { 100.0 * self.removed_volume / self.total_volume } else { 0.0 }
    }
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "removed {} self pairs and {} neighbor pairs ({:.2}% of volume), kept {}",
            self.removed_self, self.removed_neighbor, self.removed_percent(), self.kept)
    }
}

/// Accumulated demand per (origin tract, destination tract).
#[derive(Debug, Clone, Default)]
pub struct OdMatrix {
    values: AHashMap<(TractId, TractId), f64>,
}

impl OdMatrix {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.values.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Accumulate `value` onto the pair.
    #[inline]
    pub fn add(&mut self, origin: TractId, destination: TractId, value: f64) {
        *self.values.entry((origin, destination)).or_insert(0.0) += value;
    }

    #[inline]
    pub fn get(&self, origin: &TractId, destination: &TractId) -> Option<f64> {
        self.values.get(&(origin.clone(), destination.clone())).copied()
    }

    /// Add every pair of `other` into `self`.
    pub fn merge(&mut self, other: OdMatrix) {
        if self.values.is_empty() {
            self.values = other.values;
            return;
        }
        for ((origin, destination), value) in other.values {
            self.add(origin, destination, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TractId, &TractId, f64)> {
        self.values.iter().map(|((o, d), v)| (o, d, *v))
    }

    pub fn total(&self) -> f64 { self.values.values().sum() }

    /// Largest value, or None when empty.
    pub fn max(&self) -> Option<f64> {
        self.values.values().copied().reduce(f64::max)
    }

    /// Drop self pairs and pairs whose destination neighbors the origin.
    pub fn filter_pairs(&mut self, neighbors: &AdjacencyMap) -> FilterStats {
        let mut stats = FilterStats { total_volume: self.total(), ..Default::default() };
        self.values.retain(|(origin, destination), value| {
            if origin == destination {
                stats.removed_self += 1;
            } else if neighbors.contains(origin, destination) {
                stats.removed_neighbor += 1;
            } else {
                stats.kept += 1;
                return true;
            }
            stats.removed_volume += *value;
            false
        });
        stats
    }

    /// All rows, largest value first; ties ordered by origin then destination.
    pub fn sorted_desc(&self) -> Vec<OdRow> {
        let mut rows: Vec<OdRow> = self.values.iter()
            .map(|((origin, destination), value)| OdRow {
                origin: origin.clone(),
                destination: destination.clone(),
                value: *value,
            })
            .collect();
        rows.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal)
            .then_with(|| a.origin.cmp(&b.origin))
            .then_with(|| a.destination.cmp(&b.destination)));
        rows
    }
}

impl FromIterator<OdRow> for OdMatrix {
    fn from_iter<I: IntoIterator<Item = OdRow>>(rows: I) -> Self {
        let mut matrix = OdMatrix::new();
        for row in rows {
            matrix.add(row.origin, row.destination, row.value);
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(code: &str) -> TractId { TractId::new(code).unwrap() }

    #[test]
    fn add_and_merge_accumulate() {
        let (a, b) = (t("1000100"), t("1000200"));
        let mut total = OdMatrix::new();
        let mut year = OdMatrix::new();
        year.add(a.clone(), b.clone(), 3.0);
        year.add(a.clone(), b.clone(), 2.0);
        total.merge(year);

        let mut next = OdMatrix::new();
        next.add(a.clone(), b.clone(), 1.0);
        next.add(b.clone(), a.clone(), 4.0);
        total.merge(next);

        assert_eq!(total.get(&a, &b), Some(6.0));
        assert_eq!(total.get(&b, &a), Some(4.0));
        assert_eq!(total.total(), 10.0);
        assert_eq!(total.max(), Some(6.0));
        assert_eq!(OdMatrix::new().max(), None);
    }

    #[test]
    fn filter_drops_self_and_neighbor_pairs() {
        let (a, b, c) = (t("1000100"), t("1000200"), t("1000300"));
        let neighbors = AdjacencyMap::from_lists([(a.clone(), vec![b.clone()]), (b.clone(), vec![a.clone()])]);

        let mut od = OdMatrix::new();
        od.add(a.clone(), a.clone(), 10.0);
        od.add(a.clone(), b.clone(), 5.0);
        od.add(a.clone(), c.clone(), 7.0);

        let stats = od.filter_pairs(&neighbors);
        assert_eq!((stats.removed_self, stats.removed_neighbor, stats.kept), (1, 1, 1));
        assert!((stats.removed_percent() - 100.0 * 15.0 / 22.0).abs() < 1e-9);
        assert_eq!(od.sorted_desc(), vec![OdRow { origin: a, destination: c, value: 7.0 }]);
    }

    #[test]
    fn sorted_desc_breaks_ties_by_id() {
        let (a, b, c) = (t("1000100"), t("1000200"), t("1000300"));
        let od: OdMatrix = [
            OdRow { origin: b.clone(), destination: c.clone(), value: 2.0 },
            OdRow { origin: a.clone(), destination: c.clone(), value: 2.0 },
            OdRow { origin: c.clone(), destination: a.clone(), value: 9.0 },
        ].into_iter().collect();

        let order: Vec<_> = od.sorted_desc().into_iter().map(|r| (r.origin, r.value)).collect();
        assert_eq!(order, vec![(c, 9.0), (a, 2.0), (b, 2.0)]);
    }
}
