use ahash::AHashMap;

use anyhow::Result;
use geo::Point;

use crate::{geom::{Crs, Geometries}, types::{TractId, ZoneId}};

/// A polygon layer: one id per shape, shapes indexed by an R-tree.
#[derive(Debug, Clone)]
pub struct Layer<Id = String> {
    ids: Vec<Id>,
    geoms: Geometries,
}

impl<Id> Layer<Id> {
    pub(crate) fn new(ids: Vec<Id>, geoms: Geometries) -> Self {
        debug_assert_eq!(ids.len(), geoms.len(), "one id per shape");
        Self { ids, geoms }
    }

    #[inline] pub fn len(&self) -> usize { self.ids.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.ids.is_empty() }
    #[inline] pub fn ids(&self) -> &[Id] { &self.ids }
    #[inline] pub fn crs(&self) -> Crs { self.geoms.crs() }
    #[inline] pub(crate) fn geoms(&self) -> &Geometries { &self.geoms }

    /// Reproject into the working planar CRS (EPSG:2263, US feet).
    pub fn to_planar(self) -> Result<Self> {
        Ok(Self { ids: self.ids, geoms: self.geoms.reproject(Crs::NyLongIsland)? })
    }

    /// Centroids computed in the layer's CRS and expressed as lon/lat degrees.
    pub fn centroids_lonlat(&self) -> Result<Vec<Option<Point<f64>>>> {
        self.geoms.centroids_in(Crs::Wgs84)
    }

    /// Convert ids with `f`, dropping shapes whose id fails to convert.
    /// Returns the converted layer and the number of shapes dropped.
    fn convert<T, E>(self, f: impl Fn(&Id) -> Result<T, E>) -> (Layer<T>, usize) {
        let crs = self.geoms.crs();
        let mut ids = Vec::with_capacity(self.ids.len());
        let mut shapes = Vec::with_capacity(self.ids.len());
        let mut skipped = 0;
        for (id, shape) in self.ids.iter().zip(self.geoms.into_shapes()) {
            match f(id) {
                Ok(id) => { ids.push(id); shapes.push(shape); }
                Err(_) => skipped += 1,
            }
        }
        (Layer { ids, geoms: Geometries::new(shapes, crs) }, skipped)
    }
}

impl<Id: Clone + Eq + std::hash::Hash> Layer<Id> {
    /// Union shapes sharing the same id, keeping ids in first-seen order.
    pub fn dissolve(self) -> Self {
        let mut groups: Vec<(Id, Vec<usize>)> = Vec::new();
        let mut index: AHashMap<Id, usize> = AHashMap::new();
        for (i, id) in self.ids.iter().enumerate() {
            let slot = *index.entry(id.clone()).or_insert_with(|| {
                groups.push((id.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(i);
        }

        if groups.len() == self.ids.len() {
            return self;
        }

        let shapes = groups.iter()
            .map(|(_, members)| match members.as_slice() {
                [single] => self.geoms.shapes()[*single].clone(),
                many => self.geoms.union_of(many),
            })
            .collect();
        Self {
            ids: groups.into_iter().map(|(id, _)| id).collect(),
            geoms: Geometries::new(shapes, self.geoms.crs()),
        }
    }
}

impl Layer<String> {
    /// Normalize ids (GEOID, BoroCT2020, ...) into tract ids.
    /// Returns the tract layer and the number of shapes with an unusable id.
    pub fn into_tracts(self) -> (Layer<TractId>, usize) {
        self.convert(|id| TractId::parse(id))
    }

    /// Parse ids as taxi-zone LocationIDs in 1..=263.
    /// Returns the zone layer and the number of shapes with an unusable id.
    pub fn into_zones(self) -> (Layer<ZoneId>, usize) {
        self.convert(|id| {
            id.trim().parse::<f64>().ok()
                .filter(|v| v.fract() == 0.0)
                .and_then(|v| ZoneId::checked(v as i64))
                .ok_or(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use crate::geom::square;

    fn layer(ids: &[&str], shapes: Vec<geo::MultiPolygon<f64>>) -> Layer {
        Layer::new(ids.iter().map(|s| s.to_string()).collect(), Geometries::new(shapes, Crs::NyLongIsland))
    }

    #[test]
    fn dissolve_unions_duplicate_ids() {
        let zones = layer(&["7", "8", "7"], vec![
            square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0), square(1.0, 0.0, 1.0),
        ]).dissolve();

        assert_eq!(zones.ids(), ["7", "8"]);
        let areas = zones.geoms().areas();
        assert!((areas[0] - 2.0).abs() < 1e-9);
        assert!((zones.geoms().shapes()[1].unsigned_area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn into_tracts_normalizes_and_skips_bad_ids() {
        let (tracts, skipped) = layer(&["36047000200", "bogus", "1000100"], vec![
            square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0), square(2.0, 0.0, 1.0),
        ]).into_tracts();

        assert_eq!(skipped, 1);
        assert_eq!(tracts.ids().iter().map(|t| t.as_str()).collect::<Vec<_>>(), vec!["3000200", "1000100"]);
        assert_eq!(tracts.geoms().len(), 2);
    }

    #[test]
    fn into_zones_checks_range() {
        let (zones, skipped) = layer(&["1", "263.0", "264", "0"], vec![
            square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0), square(2.0, 0.0, 1.0), square(3.0, 0.0, 1.0),
        ]).into_zones();

        assert_eq!(skipped, 2);
        assert_eq!(zones.ids(), [ZoneId(1), ZoneId(263)]);
    }
}
