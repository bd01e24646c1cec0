use geo::{Area, BooleanOps, BoundingRect};

use crate::geom::{bbox::padded_envelope, Geometries};

/// Area of one piece of an overlay between two layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OverlayPiece {
    pub(crate) source: usize,
    pub(crate) target: usize,
    pub(crate) area: f64,
}

impl Geometries {
    /// Planar area of each shape, in squared CRS units.
    pub(crate) fn areas(&self) -> Vec<f64> {
        self.shapes().iter().map(|shape| shape.unsigned_area()).collect()
    }

    /// Intersect every shape in `self` with every overlapping shape in `targets`.
    ///
    /// Multi-part intersections are returned as one piece per (source, target) pair with
    /// the parts' areas summed. Pairs that only touch along a boundary are omitted.
    pub(crate) fn intersection_areas(&self, targets: &Geometries) -> Vec<OverlayPiece> {
        let mut pieces = Vec::new();
        for (source, shape) in self.shapes().iter().enumerate() {
            let Some(rect) = shape.bounding_rect() else { continue };
            let mut candidates: Vec<usize> = targets.query(&padded_envelope(&rect, 0.0)).collect();
            candidates.sort_unstable();

            for target in candidates {
                let area = shape.intersection(&targets.shapes()[target]).unsigned_area();
                if area > 0.0 {
                    pieces.push(OverlayPiece { source, target, area });
                }
            }
        }
        pieces
    }
}
