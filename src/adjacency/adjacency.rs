use std::{collections::{BTreeMap, BTreeSet}, fmt, str::FromStr};

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::{layer::Layer, types::TractId};

/// What to do with pairs the distance query reports in one direction only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymmetryPolicy {
    /// Add the reverse of every one-directional pair.
    #[default]
    Union,
    /// Keep the detection output unchanged.
    AsDetected,
}

impl FromStr for SymmetryPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "union" => Ok(SymmetryPolicy::Union),
            "as-detected" => Ok(SymmetryPolicy::AsDetected),
            other => bail!("unknown symmetry policy {other:?} (expected union or as-detected)"),
        }
    }
}

/// Summary of neighbor list sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjacencyStats {
    pub tracts: usize,
    pub mean: f64,
    pub min: usize,
    pub max: usize,
}

impl fmt::Display for AdjacencyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tracts, neighbors per tract mean {:.1} (min {}, max {})",
            self.tracts, self.mean, self.min, self.max)
    }
}

/// Tract id -> ids of the tracts within the buffer distance (never itself).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyMap {
    neighbors: BTreeMap<TractId, BTreeSet<TractId>>,
}

impl AdjacencyMap {
    /// Build the map from tract shapes in a planar CRS, with `distance` in CRS units
    /// (feet for EPSG:2263).
    pub fn build(tracts: &Layer<TractId>, distance: f64, policy: SymmetryPolicy) -> Self {
        let ids = tracts.ids();
        let mut map = AdjacencyMap::default();
        for (i, found) in tracts.geoms().neighbors_within(distance).into_iter().enumerate() {
            let entry = map.neighbors.entry(ids[i].clone()).or_default();
            entry.extend(found.into_iter().map(|j| ids[j].clone()).filter(|id| *id != ids[i]));
        }

        let asymmetric = map.asymmetric_pairs();
        if !asymmetric.is_empty() {
            log::warn!("[adjacency] {} one-directional neighbor pairs (first: {} -> {})",
                asymmetric.len(), asymmetric[0].0, asymmetric[0].1);
        }
        if policy == SymmetryPolicy::Union {
            map.symmetrize();
        }
        map
    }

    /// Build from explicit lists. Self references are dropped.
    pub fn from_lists(lists: impl IntoIterator<Item = (TractId, Vec<TractId>)>) -> Self {
        let mut map = AdjacencyMap::default();
        for (id, list) in lists {
            let entry = map.neighbors.entry(id.clone()).or_default();
            entry.extend(list.into_iter().filter(|n| *n != id));
        }
        map
    }

    #[inline] pub fn len(&self) -> usize { self.neighbors.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.neighbors.is_empty() }

    #[inline]
    pub fn neighbors(&self, tract: &TractId) -> Option<&BTreeSet<TractId>> {
        self.neighbors.get(tract)
    }

    /// True if `b` is listed as a neighbor of `a`.
    #[inline]
    pub fn contains(&self, a: &TractId, b: &TractId) -> bool {
        self.neighbors.get(a).is_some_and(|set| set.contains(b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TractId, &BTreeSet<TractId>)> {
        self.neighbors.iter()
    }

    /// Pairs (a, b) with b listed under a but a not listed under b, in id order.
    pub fn asymmetric_pairs(&self) -> Vec<(TractId, TractId)> {
        self.neighbors.iter()
            .flat_map(|(a, set)| set.iter().map(move |b| (a, b)))
            .filter(|(a, b)| !self.contains(b, a))
            .map(|(a, b)| (a.clone(), b.clone()))
            .collect()
    }

    /// Close the map under reversal: whenever b is a neighbor of a, a becomes a neighbor of b.
    pub fn symmetrize(&mut self) {
        for (a, b) in self.asymmetric_pairs() {
            self.neighbors.entry(b).or_default().insert(a);
        }
    }

    pub fn stats(&self) -> AdjacencyStats {
        let counts = self.neighbors.values().map(BTreeSet::len);
        let total: usize = counts.clone().sum();
        AdjacencyStats {
            tracts: self.neighbors.len(),
            mean: if self.neighbors.is_empty() { 0.0 } else { total as f64 / self.neighbors.len() as f64 },
            min: counts.clone().min().unwrap_or(0),
            max: counts.max().unwrap_or(0),
        }
    }
}
