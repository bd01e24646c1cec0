//! Taxi trip demand: monthly TLC yellow-cab archives, filtered, counted per zone pair,
//! then spread across tract pairs through the crosswalk.

use std::{fmt, path::PathBuf, str::FromStr};

use ahash::AHashMap;
use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;

use crate::{common::{Fetcher, Source}, crosswalk::Crosswalk, od::OdMatrix, types::ZoneId};

pub const TLC_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data";

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        ensure!((1..=12).contains(&month), "month {month} out of range 1..=12");
        Ok(Self { year, month })
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Every month from `start` through `end`, inclusive.
    pub fn range(start: Month, end: Month) -> Vec<Month> {
        std::iter::successors(Some(start), |m| Some(m.next()))
            .take_while(|m| *m <= end)
            .collect()
    }
}

impl FromStr for Month {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s.trim().split_once('-')
            .with_context(|| format!("expected YYYY-MM, got {s:?}"))?;
        Month::new(
            year.parse().with_context(|| format!("bad year in {s:?}"))?,
            month.parse().with_context(|| format!("bad month in {s:?}"))?,
        )
    }
}

impl TryFrom<String> for Month {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Quality thresholds a trip must pass to be counted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TripFilter {
    pub min_distance_miles: f64,
    pub min_duration_minutes: f64,
    pub max_duration_minutes: f64,
    pub min_passengers: f64,
    pub min_fare: f64,
}

impl Default for TripFilter {
    fn default() -> Self {
        Self {
            min_distance_miles: 2.0,
            min_duration_minutes: 5.0,
            max_duration_minutes: 240.0,
            min_passengers: 1.0,
            min_fare: 2.5,
        }
    }
}

/// The fields of one trip the filter looks at. Any missing field rejects the trip.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TripRecord {
    pub pickup_micros: Option<i64>,
    pub dropoff_micros: Option<i64>,
    pub distance_miles: Option<f64>,
    pub passengers: Option<f64>,
    pub total_amount: Option<f64>,
    pub pickup_zone: Option<i64>,
    pub dropoff_zone: Option<i64>,
}

impl TripFilter {
    /// The (pickup, dropoff) zones of a qualifying trip, or None if the trip is rejected.
    pub fn zone_pair(&self, trip: &TripRecord) -> Option<(ZoneId, ZoneId)> {
        let duration = (trip.dropoff_micros? - trip.pickup_micros?) as f64 / 60_000_000.0;
        let pickup = ZoneId::checked(trip.pickup_zone?)?;
        let dropoff = ZoneId::checked(trip.dropoff_zone?)?;

        let ok = trip.passengers? >= self.min_passengers
            && trip.total_amount? > self.min_fare
            && pickup != dropoff
            && trip.distance_miles? > self.min_distance_miles
            && (self.min_duration_minutes..=self.max_duration_minutes).contains(&duration);
        ok.then_some((pickup, dropoff))
    }
}

/// Where monthly archives come from and which months to read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TlcConfig {
    pub base_url: String,
    /// Read `yellow_tripdata_YYYY-MM.parquet` from this directory instead of downloading.
    pub local_dir: Option<PathBuf>,
    pub start: Month,
    pub end: Month,
    pub batch_size: usize,
    pub filter: TripFilter,
}

impl Default for TlcConfig {
    fn default() -> Self {
        Self {
            base_url: TLC_BASE_URL.to_string(),
            local_dir: None,
            start: Month { year: 2020, month: 1 },
            end: Month { year: 2024, month: 12 },
            batch_size: 64 * 1024,
            filter: TripFilter::default(),
        }
    }
}

impl TlcConfig {
    pub fn file_name(month: Month) -> String {
        format!("yellow_tripdata_{month}.parquet")
    }

    pub(crate) fn source(&self, month: Month) -> Source {
        let file_name = Self::file_name(month);
        let url = format!("{}/{file_name}", self.base_url.trim_end_matches('/'));
        Source::resolve(self.local_dir.as_deref(), &file_name, url)
    }
}

/// Qualifying trip counts per (pickup zone, dropoff zone).
pub type ZonePairCounts = AHashMap<(ZoneId, ZoneId), f64>;

/// Spread each zone pair's trips over every (pickup tract, dropoff tract) combination,
/// weighted by pickup_weight × dropoff_weight. Zones absent from the crosswalk are dropped.
pub fn apportion(counts: &ZonePairCounts, crosswalk: &Crosswalk) -> OdMatrix {
    let mut matrix = OdMatrix::new();
    for (&(pickup, dropoff), &trips) in counts {
        for (pickup_tract, pickup_weight) in crosswalk.weights_for(pickup) {
            for (dropoff_tract, dropoff_weight) in crosswalk.weights_for(dropoff) {
                matrix.add(pickup_tract.clone(), dropoff_tract.clone(), trips * pickup_weight * dropoff_weight);
            }
        }
    }
    matrix
}

/// Parquet columns read from each archive.
pub const TRIP_COLUMNS: [&str; 7] = [
    "tpep_pickup_datetime",
    "tpep_dropoff_datetime",
    "trip_distance",
    "passenger_count",
    "total_amount",
    "PULocationID",
    "DOLocationID",
];

/// Count qualifying trips in one monthly archive. Returns the counts and the rows read.
#[cfg(feature = "parquet")]
pub(crate) fn count_trips(bytes: bytes::Bytes, filter: &TripFilter, batch_size: usize) -> Result<(ZonePairCounts, usize)> {
    use crate::io::parquet::{f64_values, for_each_batch, i64_values, timestamp_micros};

    let mut counts = ZonePairCounts::default();
    let rows = for_each_batch(bytes, &TRIP_COLUMNS, batch_size, |batch| {
        let pickups = timestamp_micros(batch, TRIP_COLUMNS[0])?;
        let dropoffs = timestamp_micros(batch, TRIP_COLUMNS[1])?;
        let distances = f64_values(batch, TRIP_COLUMNS[2])?;
        let passengers = f64_values(batch, TRIP_COLUMNS[3])?;
        let amounts = f64_values(batch, TRIP_COLUMNS[4])?;
        let pu = i64_values(batch, TRIP_COLUMNS[5])?;
        let dz = i64_values(batch, TRIP_COLUMNS[6])?;

        for i in 0..batch.num_rows() {
            let trip = TripRecord {
                pickup_micros: pickups[i],
                dropoff_micros: dropoffs[i],
                distance_miles: distances[i],
                passengers: passengers[i],
                total_amount: amounts[i],
                pickup_zone: pu[i],
                dropoff_zone: dz[i],
            };
            if let Some(pair) = filter.zone_pair(&trip) {
                *counts.entry(pair).or_insert(0.0) += 1.0;
            }
        }
        Ok(())
    })?;
    Ok((counts, rows))
}

#[cfg(not(feature = "parquet"))]
pub(crate) fn count_trips(_bytes: bytes::Bytes, _filter: &TripFilter, _batch_size: usize) -> Result<(ZonePairCounts, usize)> {
    bail!("reading trip archives requires the `parquet` feature")
}

/// Result of reading every configured month.
#[derive(Debug, Default)]
pub struct TripsOutcome {
    pub matrix: OdMatrix,
    pub months_ok: usize,
    pub months_failed: usize,
    pub trips_counted: f64,
}

/// Read each month, count qualifying trips, and apportion them onto tracts.
/// A month that fails to download or decode is logged and skipped.
pub(crate) fn aggregate(config: &TlcConfig, crosswalk: &Crosswalk, fetcher: &mut Fetcher) -> Result<TripsOutcome> {
    let months = Month::range(config.start, config.end);
    if months.is_empty() {
        bail!("[trips] empty month range {} .. {}", config.start, config.end);
    }

    let mut outcome = TripsOutcome::default();
    for (i, month) in months.iter().enumerate() {
        let source = config.source(*month);
        log::info!("[trips] ({}/{}) {}", i + 1, months.len(), source.label());
        let counted = fetcher.read_all(&source)
            .and_then(|bytes| count_trips(bytes, &config.filter, config.batch_size))
            .with_context(|| format!("processing {source}"));
        match counted {
            Ok((counts, rows)) => {
                let trips: f64 = counts.values().sum();
                let month_od = apportion(&counts, crosswalk);
                log::info!("[trips] {month}: {trips} of {rows} trips qualified, {} tract pairs", month_od.len());
                outcome.trips_counted += trips;
                outcome.matrix.merge(month_od);
                outcome.months_ok += 1;
            }
            Err(e) => {
                log::warn!("[trips] skipping {month}: {e:#}");
                outcome.months_failed += 1;
            }
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TractId;

    const MINUTE: i64 = 60_000_000;

    fn good_trip() -> TripRecord {
        TripRecord {
            pickup_micros: Some(0),
            dropoff_micros: Some(20 * MINUTE),
            distance_miles: Some(3.5),
            passengers: Some(1.0),
            total_amount: Some(18.0),
            pickup_zone: Some(161),
            dropoff_zone: Some(237),
        }
    }

    #[test]
    fn accepts_a_normal_trip() {
        assert_eq!(TripFilter::default().zone_pair(&good_trip()), Some((ZoneId(161), ZoneId(237))));
    }

    #[test]
    fn each_field_can_reject() {
        let filter = TripFilter::default();
        let rejects: Vec<TripRecord> = vec![
            TripRecord { passengers: Some(0.0), ..good_trip() },
            TripRecord { total_amount: Some(2.5), ..good_trip() },
            TripRecord { dropoff_zone: Some(161), ..good_trip() },
            TripRecord { pickup_zone: Some(264), ..good_trip() },
            TripRecord { dropoff_zone: Some(0), ..good_trip() },
            TripRecord { distance_miles: Some(2.0), ..good_trip() },
            TripRecord { dropoff_micros: Some(4 * MINUTE), ..good_trip() },
            TripRecord { dropoff_micros: Some(241 * MINUTE), ..good_trip() },
            TripRecord { passengers: None, ..good_trip() },
            TripRecord { pickup_micros: None, ..good_trip() },
        ];
        for (i, trip) in rejects.iter().enumerate() {
            assert_eq!(filter.zone_pair(trip), None, "case {i} should be rejected");
        }
    }

    #[test]
    fn duration_bounds_are_inclusive() {
        let filter = TripFilter::default();
        assert!(filter.zone_pair(&TripRecord { dropoff_micros: Some(5 * MINUTE), ..good_trip() }).is_some());
        assert!(filter.zone_pair(&TripRecord { dropoff_micros: Some(240 * MINUTE), ..good_trip() }).is_some());
    }

    #[test]
    fn months_parse_and_span_years() {
        let range = Month::range("2023-11".parse().unwrap(), "2024-02".parse().unwrap());
        assert_eq!(range.iter().map(Month::to_string).collect::<Vec<_>>(), vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(Month::range(Month { year: 2020, month: 1 }, Month { year: 2024, month: 12 }).len(), 60);
        assert!("2024-13".parse::<Month>().is_err());
        assert!("202401".parse::<Month>().is_err());
    }

    #[test]
    fn urls_follow_the_archive_layout() {
        let config = TlcConfig::default();
        let Source::Remote(url) = config.source(Month { year: 2021, month: 3 }) else { panic!("expected remote") };
        assert_eq!(url, "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_2021-03.parquet");
    }

    #[test]
    fn apportion_multiplies_weights() {
        let (a, b, c) = (TractId::new("1000100").unwrap(), TractId::new("1000200").unwrap(), TractId::new("4000100").unwrap());
        let crosswalk = Crosswalk::from_overlay([
            (ZoneId(1), a.clone(), 0.25),
            (ZoneId(1), b.clone(), 0.75),
            (ZoneId(2), c.clone(), 1.0),
        ], 0.01);
        let counts = ZonePairCounts::from_iter([
            ((ZoneId(1), ZoneId(2)), 8.0),
            ((ZoneId(2), ZoneId(99)), 5.0),
        ]);

        let od = apportion(&counts, &crosswalk);
        assert_eq!(od.len(), 2);
        assert_eq!(od.get(&a, &c), Some(2.0));
        assert_eq!(od.get(&b, &c), Some(6.0));
        assert_eq!(od.total(), 8.0);
    }

    #[cfg(feature = "parquet")]
    #[test]
    fn counts_trips_from_parquet() {
        use std::sync::Arc;
        use arrow_array::{ArrayRef, Float64Array, Int32Array, TimestampMicrosecondArray};
        use crate::io::parquet::tests::parquet_bytes;

        let bytes = parquet_bytes(vec![
            ("tpep_pickup_datetime", Arc::new(TimestampMicrosecondArray::from(vec![0, 0, 0])) as ArrayRef),
            ("tpep_dropoff_datetime", Arc::new(TimestampMicrosecondArray::from(vec![20 * MINUTE, 20 * MINUTE, MINUTE])) as ArrayRef),
            ("trip_distance", Arc::new(Float64Array::from(vec![3.0, 4.0, 3.0])) as ArrayRef),
            ("passenger_count", Arc::new(Float64Array::from(vec![Some(1.0), Some(2.0), Some(1.0)])) as ArrayRef),
            ("total_amount", Arc::new(Float64Array::from(vec![15.0, 20.0, 15.0])) as ArrayRef),
            ("PULocationID", Arc::new(Int32Array::from(vec![1, 1, 1])) as ArrayRef),
            ("DOLocationID", Arc::new(Int32Array::from(vec![2, 2, 2])) as ArrayRef),
            ("VendorID", Arc::new(Int32Array::from(vec![1, 1, 1])) as ArrayRef),
        ]);

        let (counts, rows) = count_trips(bytes, &TripFilter::default(), 2).unwrap();
        assert_eq!(rows, 3);
        assert_eq!(counts.get(&(ZoneId(1), ZoneId(2))), Some(&2.0));
    }
}
