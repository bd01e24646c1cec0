//! IO module for format-specific reading and writing operations.
//!
//! Each format module handles one file format; domain types (crosswalk, OD tables,
//! demand rows) build on these helpers in their own `io` submodules.
//!
//! # Format Modules
//!
//! - `csv` - CSV stage tables, read and written through Polars
//! - `shp` - Shapefile polygons and their dBase attribute records
//! - `geojson` - GeoJSON FeatureCollections of Polygon/MultiPolygon features
//! - `parquet` - Projected record-batch reads of monthly trip archives (feature `parquet`)

pub(crate) mod csv;
pub(crate) mod geojson;
#[cfg(feature = "parquet")]
pub(crate) mod parquet;
pub(crate) mod shp;
