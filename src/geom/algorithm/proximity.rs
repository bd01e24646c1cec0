use geo::{BoundingRect, Distance, Euclidean, MultiPolygon};

use crate::geom::{bbox::padded_envelope, Geometries};

impl Geometries {
    /// For each shape, list the other shapes lying within `distance` of it (in CRS units).
    ///
    /// Equivalent to buffering each shape by `distance` and keeping the shapes whose
    /// geometry intersects the buffer: the R-tree is searched with the shape's bounding box
    /// grown by `distance`, then each candidate's exact distance is checked.
    /// A shape is never listed as its own neighbor.
    pub(crate) fn neighbors_within(&self, distance: f64) -> Vec<Vec<usize>> {
        self.shapes().iter().enumerate()
            .map(|(i, shape)| {
                let Some(rect) = shape.bounding_rect() else { return Vec::new() };
                let mut found: Vec<usize> = self.query(&padded_envelope(&rect, distance))
                    .filter(|&j| j != i)
                    .filter(|&j| within_distance(shape, &self.shapes()[j], distance))
                    .collect();
                found.sort_unstable();
                found
            })
            .collect()
    }
}

/// True if any part of `a` lies within `distance` of any part of `b`.
/// Polygon distance is zero when the polygons intersect or one contains the other.
fn within_distance(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>, distance: f64) -> bool {
    a.iter().any(|pa| b.iter().any(|pb| Euclidean.distance(pa, pb) <= distance))
}
