use ahash::AHashMap;
use geo::{Distance, Haversine, Point};

use crate::types::TractId;

use super::DemandRow;

/// Great-circle distance in kilometers between two lon/lat points.
#[inline]
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b) / 1000.0
}

/// Fill `distance_km` for every row from tract centroids (lon/lat). Rows with an unknown
/// centroid are left empty; returns how many.
pub fn attach_distances(rows: &mut [DemandRow], centroids: &AHashMap<TractId, Point<f64>>) -> usize {
    let mut missing = 0;
    for row in rows.iter_mut() {
        row.distance_km = match (centroids.get(&row.origin), centroids.get(&row.destination)) {
            (Some(a), Some(b)) => Some(haversine_km(*a, *b)),
            _ => {
                missing += 1;
                None
            }
        };
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(code: &str) -> TractId { TractId::new(code).unwrap() }

    fn row(o: &str, d: &str) -> DemandRow {
        DemandRow {
            origin: t(o),
            destination: t(d),
            norm_trips: 0.0,
            norm_commuters: 0.0,
            universal_demand: 0.0,
            distance_km: None,
        }
    }

    #[test]
    fn one_degree_of_latitude() {
        let km = haversine_km(Point::new(-74.0, 40.0), Point::new(-74.0, 41.0));
        assert!((km - 111.19).abs() < 0.05, "{km}");
    }

    #[test]
    fn missing_centroids_are_counted() {
        let centroids = AHashMap::from_iter([
            (t("1000100"), Point::new(-73.99, 40.75)),
            (t("3000200"), Point::new(-73.95, 40.68)),
        ]);
        let mut rows = vec![row("1000100", "3000200"), row("1000100", "1000100"), row("1000100", "4000100")];

        assert_eq!(attach_distances(&mut rows, &centroids), 1);
        assert!(rows[0].distance_km.unwrap() > 8.0 && rows[0].distance_km.unwrap() < 9.0);
        assert_eq!(rows[1].distance_km, Some(0.0));
        assert_eq!(rows[2].distance_km, None);
    }
}
