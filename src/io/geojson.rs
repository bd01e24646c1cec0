//! GeoJSON reading for polygon layers.

use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;

use crate::geom::Crs;

/// Features read from a GeoJSON FeatureCollection.
pub(crate) struct GeoJsonLayer {
    pub(crate) ids: Vec<String>,
    pub(crate) shapes: Vec<MultiPolygon<f64>>,
    /// CRS named by the legacy `crs` member, if any.
    pub(crate) crs: Option<Crs>,
}

/// Read every Polygon/MultiPolygon feature, taking its id from `properties[id_field]`.
/// Features with other geometry types are skipped.
pub(crate) fn read_geojson(path: &Path, id_field: &str) -> Result<GeoJsonLayer> {
    let bytes = fs::read(path)
        .with_context(|| format!("[io::geojson] Failed to read {}", path.display()))?;
    parse_geojson(&bytes, id_field)
        .with_context(|| format!("[io::geojson] Failed to parse {}", path.display()))
}

pub(crate) fn parse_geojson(bytes: &[u8], id_field: &str) -> Result<GeoJsonLayer> {
    let value: Value = serde_json::from_slice(bytes).context("invalid JSON")?;
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("not a FeatureCollection (missing `features` array)"))?;

    let crs = value["crs"]["properties"]["name"].as_str().and_then(Crs::from_urn);

    let mut ids = Vec::with_capacity(features.len());
    let mut shapes = Vec::with_capacity(features.len());
    for (i, feature) in features.iter().enumerate() {
        let geometry = &feature["geometry"];
        let coords = geometry["coordinates"].as_array();
        let shape = match (geometry["type"].as_str(), coords) {
            (Some("Polygon"), Some(coords)) => MultiPolygon(vec![parse_polygon(coords)?]),
            (Some("MultiPolygon"), Some(coords)) => MultiPolygon(coords.iter()
                .map(|polygon| polygon.as_array()
                    .ok_or_else(|| anyhow!("feature {i}: polygon is not an array"))
                    .and_then(|rings| parse_polygon(rings)))
                .collect::<Result<Vec<_>>>()?),
            _ => continue,
        };

        let id = match &feature["properties"][id_field] {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => bail!("feature {i}: missing property {id_field:?}"),
        };

        ids.push(id);
        shapes.push(shape);
    }

    Ok(GeoJsonLayer { ids, shapes, crs })
}

/// Parse polygon rings: the first ring is the exterior, the rest are holes.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| ring.as_array()
        .ok_or_else(|| anyhow!("ring is not an array"))
        .and_then(|coords| parse_ring(coords)));
    let exterior = rings.next().ok_or_else(|| anyhow!("polygon has no exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring of `[x, y]` positions; extra dimensions are ignored.
fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    coords.iter()
        .map(|position| {
            let x = position[0].as_f64().ok_or_else(|| anyhow!("invalid coordinate: x must be a number"))?;
            let y = position[1].as_f64().ok_or_else(|| anyhow!("invalid coordinate: y must be a number"))?;
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString)
}
