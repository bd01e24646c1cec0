use anyhow::{Context, Result};
use geo::Point;

use crate::geom::{Crs, Geometries};

impl Geometries {
    /// Reproject all shapes into `to`, rebuilding the R-tree in the new coordinates.
    pub(crate) fn reproject(self, to: Crs) -> Result<Geometries> {
        if self.crs() == to {
            return Ok(self);
        }
        let from = self.crs();
        let transformer = from.transformer(to)?;
        let shapes = self.into_shapes().iter()
            .enumerate()
            .map(|(i, shape)| transformer.multi_polygon(shape)
                .with_context(|| format!("reprojecting shape {i} from EPSG:{} to EPSG:{}", from.epsg(), to.epsg())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Geometries::new(shapes, to))
    }

    /// Centroids computed in the native CRS, then expressed in `to` (degrees if geographic).
    pub(crate) fn centroids_in(&self, to: Crs) -> Result<Vec<Option<Point<f64>>>> {
        let transformer = self.crs().transformer(to)?;
        self.centroids().into_iter()
            .map(|centroid| centroid.map(|pt| transformer.point(pt)).transpose())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, MultiPolygon, polygon};

    #[test]
    fn reprojected_lonlat_square_has_planar_area() {
        // A 0.01 x 0.01 degree cell in lower Manhattan.
        let cell = MultiPolygon::new(vec![polygon![
            (x: -74.01, y: 40.70),
            (x: -74.00, y: 40.70),
            (x: -74.00, y: 40.71),
            (x: -74.01, y: 40.71),
            (x: -74.01, y: 40.70),
        ]]);
        let geoms = Geometries::new(vec![cell], Crs::Wgs84).reproject(Crs::NyLongIsland).unwrap();
        assert_eq!(geoms.crs(), Crs::NyLongIsland);

        // ~843 m x ~1112 m, about 1.0e7 sq ft.
        let area = geoms.shapes()[0].unsigned_area();
        assert!(area > 0.9e7 && area < 1.1e7, "area = {area}");

        let centroid = geoms.centroids_in(Crs::Wgs84).unwrap()[0].unwrap();
        assert!((centroid.x() + 74.005).abs() < 1e-4);
        assert!((centroid.y() - 40.705).abs() < 1e-4);
    }
}
