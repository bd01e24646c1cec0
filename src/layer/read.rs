use std::path::Path;

use anyhow::{bail, Context, Result};
use geo::{BoundingRect, MultiPolygon, Rect};

use crate::{geom::{Crs, Geometries}, io::{geojson, shp}};

use super::Layer;

impl Layer {
    /// Read a polygon layer from a shapefile or GeoJSON file, chosen by extension.
    /// The id comes from the first field in `id_fields` present in the file.
    pub fn read(path: &Path, id_fields: &[&str]) -> Result<Self> {
        let ext = path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("shp") => Self::from_shapefile(path, id_fields),
            Some("geojson" | "json") => Self::from_geojson(path, id_fields),
            _ => bail!("[layer::read] Unsupported layer format: {}", path.display()),
        }
    }

    pub fn from_shapefile(path: &Path, id_fields: &[&str]) -> Result<Self> {
        let (shapes, records) = shp::read_shapefile(path)?;

        let field = records.first()
            .and_then(|record| {
                let names = shp::field_names(record);
                id_fields.iter().find(|f| names.iter().any(|n| n == *f)).copied()
            })
            .with_context(|| format!("[layer::read] {} has none of the id fields {id_fields:?}", path.display()))?;

        let ids = records.iter().enumerate()
            .map(|(i, record)| shp::field_as_string(record, field)
                .with_context(|| format!("[layer::read] record {i} in {} has no {field}", path.display())))
            .collect::<Result<Vec<_>>>()?;

        let crs = match shp::crs_from_prj(path) {
            Some(crs) => crs,
            None => {
                let crs = infer_crs(&shapes, Crs::Nad83);
                log::warn!("[layer::read] No recognized .prj for {}; assuming EPSG:{}", path.display(), crs.epsg());
                crs
            }
        };

        log::debug!("[layer::read] {} shapes from {} (id field {field}, EPSG:{})", ids.len(), path.display(), crs.epsg());
        Ok(Layer::new(ids, Geometries::new(shapes, crs)))
    }

    pub fn from_geojson(path: &Path, id_fields: &[&str]) -> Result<Self> {
        let mut last_err = None;
        for field in id_fields {
            match geojson::read_geojson(path, field) {
                Ok(layer) => {
                    let crs = layer.crs.unwrap_or_else(|| infer_crs(&layer.shapes, Crs::Wgs84));
                    log::debug!("[layer::read] {} shapes from {} (id field {field}, EPSG:{})",
                        layer.ids.len(), path.display(), crs.epsg());
                    return Ok(Layer::new(layer.ids, Geometries::new(layer.shapes, crs)));
                }
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(e.context(format!("[layer::read] no usable id field among {id_fields:?}"))),
            None => bail!("[layer::read] no id fields given for {}", path.display()),
        }
    }
}

/// Guess the CRS from coordinate magnitudes: values within lon/lat range are taken to be
/// `geographic`, anything else the NY state plane.
fn infer_crs(shapes: &[MultiPolygon<f64>], geographic: Crs) -> Crs {
    let lonlat = shapes.iter()
        .filter_map(|shape| shape.bounding_rect())
        .all(|rect| is_lonlat(&rect));
    if lonlat { geographic } else { Crs::NyLongIsland }
}

#[inline]
fn is_lonlat(rect: &Rect<f64>) -> bool {
    rect.min().x >= -180.0 && rect.max().x <= 180.0 && rect.min().y >= -90.0 && rect.max().y <= 90.0
}
