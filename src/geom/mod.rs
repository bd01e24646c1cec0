mod algorithm;
mod bbox;
mod crs;
mod geom;

use bbox::BoundingBox;
pub use crs::Crs;
pub(crate) use geom::Geometries;

#[cfg(test)]
pub(crate) use geom::tests::square;
