//! Shapefile reading: polygons plus their dBase attribute records.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{dbase::{FieldValue, Record}, PolygonRing, Reader, Shape};

use crate::geom::Crs;

/// Reads all polygon shapes + attribute records from a given `.shp` file path.
pub(crate) fn read_shapefile(path: &Path) -> Result<(Vec<MultiPolygon<f64>>, Vec<Record>)> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp] Failed to open shapefile: {}", path.display()))?;

    let count = reader.shape_count()?;
    let mut shapes = Vec::with_capacity(count);
    let mut records = Vec::with_capacity(count);
    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result
            .with_context(|| format!("[io::shp] Error reading shape+record {i} in {}", path.display()))?;
        shapes.push(shape_to_multipolygon(shape)
            .with_context(|| format!("[io::shp] shape {i} in {}", path.display()))?);
        records.push(record);
    }
    Ok((shapes, records))
}

/// Convert a shapefile shape into a geo MultiPolygon.
fn shape_to_multipolygon(shape: Shape) -> Result<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(polygon) => Ok(rings_to_multipolygon(
            polygon.rings().iter().map(|ring| match ring {
                PolygonRing::Outer(points) => (true, points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()),
                PolygonRing::Inner(points) => (false, points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()),
            })
        )),
        Shape::PolygonZ(polygon) => Ok(rings_to_multipolygon(
            polygon.rings().iter().map(|ring| match ring {
                PolygonRing::Outer(points) => (true, points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()),
                PolygonRing::Inner(points) => (false, points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()),
            })
        )),
        Shape::NullShape => Ok(MultiPolygon::new(vec![])),
        other => bail!("found non-Polygon shape in layer: {:?}", other.shapetype()),
    }
}

/// Group rings in Shapefile order: each exterior is followed by its holes.
fn rings_to_multipolygon(rings: impl Iterator<Item = (bool, Vec<Coord<f64>>)>) -> MultiPolygon<f64> {
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for (is_exterior, coords) in rings {
        // LineString -> Polygon closes rings that aren't already closed.
        let ring = LineString(coords);
        if is_exterior {
            if let Some(ext) = exterior.take() {
                polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(ring);
        } else {
            holes.push(ring);
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polygons)
}

/// Get an attribute as text. Whole numbers are printed without a fractional part,
/// so numeric id fields (e.g. `LocationID`) read the same as character ones.
pub(crate) fn field_as_string(record: &Record, field: &str) -> Option<String> {
    fn number(n: f64) -> String {
        if n.fract() == 0.0 { format!("{}", n as i64) } else { n.to_string() }
    }

    match record.get(field)? {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        FieldValue::Numeric(Some(n)) => Some(number(*n)),
        FieldValue::Float(Some(n)) => Some(number(f64::from(*n))),
        FieldValue::Double(n) => Some(number(*n)),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Names of the attribute fields present on a record.
pub(crate) fn field_names(record: &Record) -> Vec<String> {
    record.clone().into_iter().map(|(name, _)| name).collect()
}

/// Detect the CRS from the `.prj` sidecar next to `path`, if present and recognized.
pub(crate) fn crs_from_prj(path: &Path) -> Option<Crs> {
    let wkt = fs::read_to_string(path.with_extension("prj")).ok()?;
    Crs::from_wkt(wkt.trim())
}
