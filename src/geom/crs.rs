use anyhow::{anyhow, Context, Result};
use geo::{Coord, MapCoords, MultiPolygon, Point};
use proj4rs::{proj::Proj as Proj4, transform::transform};

/// Coordinate reference systems the pipeline reads and works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// NAD83 lon/lat (EPSG:4269), used by Census TIGER files.
    Nad83,
    /// WGS84 lon/lat (EPSG:4326), the GeoJSON default.
    Wgs84,
    /// NAD83 / New York Long Island state plane in US feet (EPSG:2263), the working planar CRS.
    NyLongIsland,
}

impl Crs {
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Nad83 => 4269,
            Crs::Wgs84 => 4326,
            Crs::NyLongIsland => 2263,
        }
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4269 => Some(Crs::Nad83),
            4326 => Some(Crs::Wgs84),
            2263 => Some(Crs::NyLongIsland),
            _ => None,
        }
    }

    #[inline] pub fn is_geographic(&self) -> bool { !matches!(self, Crs::NyLongIsland) }

    /// PROJ.4 definition for this CRS.
    fn proj4(&self) -> &'static str {
        match self {
            Crs::Nad83 => "+proj=longlat +datum=NAD83 +no_defs +type=crs",
            Crs::Wgs84 => "+proj=longlat +datum=WGS84 +no_defs +type=crs",
            Crs::NyLongIsland => "+proj=lcc +lat_0=40.1666666666667 +lon_0=-74 +lat_1=41.0333333333333 \
                +lat_2=40.6666666666667 +x_0=300000 +y_0=0 +datum=NAD83 +units=us-ft +no_defs +type=crs",
        }
    }

    fn build(&self) -> Result<Proj4> {
        Proj4::from_proj_string(self.proj4())
            .map_err(|e| anyhow!("{e:?}"))
            .with_context(|| format!("failed to build PROJ.4 for EPSG:{}", self.epsg()))
    }

    /// Identify a CRS from the WKT text of a shapefile `.prj` sidecar.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        let wkt = wkt.to_ascii_lowercase();
        if wkt.starts_with("projcs") {
            let long_island = wkt.contains("long_island") || wkt.contains("long island");
            let new_york = wkt.contains("new_york") || wkt.contains("new york");
            return (long_island && new_york).then_some(Crs::NyLongIsland);
        }
        if wkt.starts_with("geogcs") {
            if wkt.contains("north_american_1983") || wkt.contains("nad83") {
                return Some(Crs::Nad83);
            }
            if wkt.contains("wgs_1984") || wkt.contains("wgs 84") || wkt.contains("wgs84") {
                return Some(Crs::Wgs84);
            }
        }
        None
    }

    /// Identify a CRS from a GeoJSON `crs` name such as "urn:ogc:def:crs:EPSG::2263".
    pub fn from_urn(name: &str) -> Option<Self> {
        if name.ends_with("CRS84") {
            return Some(Crs::Wgs84);
        }
        name.rsplit(':').next()?.parse().ok().and_then(Self::from_epsg)
    }

    /// Project coordinates from `self` into `to`. Geographic coordinates are in degrees.
    pub(crate) fn transformer(&self, to: Crs) -> Result<Transformer> {
        Ok(Transformer { from: *self, to, src: self.build()?, dst: to.build()? })
    }
}

/// A prepared pair of projections.
pub(crate) struct Transformer {
    from: Crs,
    to: Crs,
    src: Proj4,
    dst: Proj4,
}

impl Transformer {
    pub(crate) fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        if self.from == self.to {
            return Ok(coord);
        }
        let mut point = if self.from.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.src, &self.dst, &mut point)
            .map_err(|e| anyhow!("CRS transform EPSG:{} -> EPSG:{} failed: {e:?}", self.from.epsg(), self.to.epsg()))?;
        Ok(if self.to.is_geographic() {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }

    pub(crate) fn point(&self, point: Point<f64>) -> Result<Point<f64>> {
        self.coord(point.0).map(Point)
    }

    pub(crate) fn multi_polygon(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        shape.try_map_coords(|coord| self.coord(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wkt_detection() {
        let state_plane = r#"PROJCS["NAD_1983_StatePlane_New_York_Long_Island_FIPS_3104_Feet",GEOGCS["GCS_North_American_1983"]]"#;
        assert_eq!(Crs::from_wkt(state_plane), Some(Crs::NyLongIsland));
        assert_eq!(Crs::from_wkt(r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983"]]"#), Some(Crs::Nad83));
        assert_eq!(Crs::from_wkt(r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984"]]"#), Some(Crs::Wgs84));
        assert_eq!(Crs::from_wkt(r#"PROJCS["WGS_1984_Web_Mercator"]"#), None);
    }

    #[test]
    fn urn_detection() {
        assert_eq!(Crs::from_urn("urn:ogc:def:crs:EPSG::2263"), Some(Crs::NyLongIsland));
        assert_eq!(Crs::from_urn("urn:ogc:def:crs:OGC:1.3:CRS84"), Some(Crs::Wgs84));
        assert_eq!(Crs::from_urn("EPSG:3857"), None);
    }

    #[test]
    fn state_plane_round_trip() {
        // Near Columbus Circle, Manhattan.
        let lonlat = Coord { x: -73.9819, y: 40.7681 };
        let forward = Crs::Nad83.transformer(Crs::NyLongIsland).unwrap();
        let backward = Crs::NyLongIsland.transformer(Crs::Nad83).unwrap();

        let projected = forward.coord(lonlat).unwrap();
        // Manhattan lies roughly 980k-1010k ft east, 190k-260k ft north in EPSG:2263.
        assert!(projected.x > 950_000.0 && projected.x < 1_050_000.0, "x = {}", projected.x);
        assert!(projected.y > 150_000.0 && projected.y < 300_000.0, "y = {}", projected.y);

        let back = backward.coord(projected).unwrap();
        assert!((back.x - lonlat.x).abs() < 1e-7);
        assert!((back.y - lonlat.y).abs() < 1e-7);
    }

    #[test]
    fn identity_transform_is_a_no_op() {
        let t = Crs::NyLongIsland.transformer(Crs::NyLongIsland).unwrap();
        let c = Coord { x: 1.0, y: 2.0 };
        assert_eq!(t.coord(c).unwrap(), c);
    }
}
