use geo::{BooleanOps, BoundingRect, Centroid, MultiPolygon, Point};
use rstar::{RTree, AABB};

use crate::geom::{BoundingBox, Crs};

/// Geometries is a collection of MultiPolygons indexed by an R-tree of their bounding boxes.
#[derive(Debug, Clone)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
    crs: Crs,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes are kept (so indices line up with their ids) but never indexed.
    pub(crate) fn new(shapes: Vec<MultiPolygon<f64>>, crs: Crs) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| shape.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            shapes,
            crs,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub(crate) fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Consume into the list of MultiPolygons.
    #[inline] pub(crate) fn into_shapes(self) -> Vec<MultiPolygon<f64>> { self.shapes }

    /// Coordinate reference system of the shapes.
    #[inline] pub(crate) fn crs(&self) -> Crs { self.crs }

    /// Query the R-tree for indices whose bounding boxes intersect the given envelope.
    #[inline]
    pub(crate) fn query(&self, envelope: &AABB<[f64; 2]>) -> impl Iterator<Item = usize> + '_ {
        self.rtree.locate_in_envelope_intersecting(envelope).map(|bb| bb.idx())
    }

    /// Compute the centroid of each MultiPolygon (None for empty shapes).
    pub(crate) fn centroids(&self) -> Vec<Option<Point<f64>>> {
        self.shapes.iter().map(|polygon| polygon.centroid()).collect()
    }

    /// Union the shapes at `indices` into a single MultiPolygon.
    /// This method may be slow for large numbers of complex polygons.
    pub(crate) fn union_of(&self, indices: &[usize]) -> MultiPolygon<f64> {
        indices.iter()
            .map(|&i| self.shapes[i].clone())
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| MultiPolygon::new(vec![]))
    }
}
