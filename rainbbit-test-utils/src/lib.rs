//! RAINBBIT Test Utilities
//!
//! Centralized test infrastructure for the RAINBBIT workspace:
//! - Proptest generators for records, windows and measure lists
//! - Store doubles that count or fail queries
//! - Test fixtures for common scenarios
//! - Custom assertions

// Re-export the in-memory store from its source crate
pub use rainbbit_storage::InMemoryMeasurementStore;

// Re-export core types for convenience
pub use rainbbit_core::{
    AlignedWindow, CacheKey, ConditionCatalog, DataPoint, MeasureSet, RainbbitError,
    RainbbitResult, Record, StorageError, ValidationError, MAX_PROJECTED_MEASURES, MEASURES,
};

use async_trait::async_trait;
use rainbbit_storage::MeasurementStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// ============================================================================
// STORE DOUBLES
// ============================================================================

/// Wraps an in-memory store and counts every query that reaches it.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryMeasurementStore,
    record_queries: AtomicUsize,
    latest_queries: AtomicUsize,
    projection_queries: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: InMemoryMeasurementStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn record_queries(&self) -> usize {
        self.record_queries.load(Ordering::SeqCst)
    }

    pub fn latest_queries(&self) -> usize {
        self.latest_queries.load(Ordering::SeqCst)
    }

    pub fn projection_queries(&self) -> usize {
        self.projection_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MeasurementStore for CountingStore {
    async fn query_records(&self, window: AlignedWindow) -> RainbbitResult<Vec<Record>> {
        self.record_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_records(window).await
    }

    async fn query_latest_record(&self) -> RainbbitResult<Option<Record>> {
        self.latest_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_latest_record().await
    }

    async fn query_projection(
        &self,
        columns: &[String],
        window: AlignedWindow,
    ) -> RainbbitResult<Vec<DataPoint>> {
        self.projection_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_projection(columns, window).await
    }

    async fn known_measure_names(&self) -> RainbbitResult<Vec<String>> {
        self.inner.known_measure_names().await
    }

    async fn insert_record(&self, record: Record) -> RainbbitResult<()> {
        self.inner.insert_record(record).await
    }
}

/// A store whose queries fail while `failing` is set.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryMeasurementStore,
    failing: AtomicBool,
    queries: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: InMemoryMeasurementStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &str) -> RainbbitResult<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::QueryFailed {
                operation: operation.to_string(),
                reason: "injected failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl MeasurementStore for FlakyStore {
    async fn query_records(&self, window: AlignedWindow) -> RainbbitResult<Vec<Record>> {
        self.check("query_records")?;
        self.inner.query_records(window).await
    }

    async fn query_latest_record(&self) -> RainbbitResult<Option<Record>> {
        self.check("query_latest_record")?;
        self.inner.query_latest_record().await
    }

    async fn query_projection(
        &self,
        columns: &[String],
        window: AlignedWindow,
    ) -> RainbbitResult<Vec<DataPoint>> {
        self.check("query_projection")?;
        self.inner.query_projection(columns, window).await
    }

    async fn known_measure_names(&self) -> RainbbitResult<Vec<String>> {
        self.inner.known_measure_names().await
    }

    async fn insert_record(&self, record: Record) -> RainbbitResult<()> {
        self.check("insert_record")?;
        self.inner.insert_record(record).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating RAINBBIT types.

    use super::*;
    use proptest::prelude::*;

    /// Epoch seconds between 2000 and 2100.
    pub fn arb_timestamp() -> impl Strategy<Value = i64> {
        946_684_800i64..4_102_444_800
    }

    /// An optional window bound.
    pub fn arb_bound() -> impl Strategy<Value = Option<i64>> {
        proptest::option::of(arb_timestamp())
    }

    /// A window whose bounds, when both present, are ordered.
    pub fn arb_window() -> impl Strategy<Value = AlignedWindow> {
        (arb_bound(), arb_bound()).prop_map(|(from, to)| match (from, to) {
            (Some(f), Some(t)) if f > t => AlignedWindow {
                from: Some(t),
                to: Some(f),
            },
            _ => AlignedWindow { from, to },
        })
    }

    /// One of the known measure names.
    pub fn arb_measure() -> impl Strategy<Value = String> {
        proptest::sample::select(MEASURES).prop_map(str::to_string)
    }

    /// A projectable list of known measures, possibly with repeats.
    pub fn arb_measure_list() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec(arb_measure(), 1..=MAX_PROJECTED_MEASURES)
    }

    /// A plausible weather record.
    pub fn arb_record() -> impl Strategy<Value = Record> {
        (
            arb_timestamp(),
            -30.0f64..45.0,
            950.0f64..1050.0,
            0i64..=100,
            0.0f64..40.0,
            0.0f64..360.0,
            0i64..=100,
        )
            .prop_map(|(dt, temp, pressure, humidity, wind_speed, wind_deg, clouds)| Record {
                dt,
                visibility: 10_000,
                sunrise: dt - 6 * 3600,
                sunset: dt + 6 * 3600,
                temp,
                temp_min: temp - 2.0,
                temp_max: temp + 2.0,
                feels_like: temp - 1.0,
                pressure,
                sea_level: pressure,
                grnd_level: pressure - 10.0,
                humidity,
                wind_speed,
                wind_deg,
                clouds_all: clouds,
                rain_1h: 0.0,
                snow_1h: 0.0,
                weather: "800".to_string(),
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Ingestion interval used by most fixtures.
    pub const HALF_HOUR: i64 = 1800;

    /// A deterministic record at `dt`. Values drift with `dt` so series are distinguishable.
    pub fn record_at(dt: i64) -> Record {
        let step = (dt / HALF_HOUR) as f64;
        Record {
            dt,
            visibility: 10_000,
            sunrise: dt - 3600,
            sunset: dt + 3600,
            temp: 10.0 + step,
            temp_min: 8.0 + step,
            temp_max: 12.0 + step,
            feels_like: 9.0 + step,
            pressure: 1000.0 + step,
            sea_level: 1001.0 + step,
            grnd_level: 990.0 + step,
            humidity: 60,
            wind_speed: 3.5,
            wind_deg: 90.0,
            clouds_all: 20,
            rain_1h: 0.0,
            snow_1h: 0.0,
            weather: "800".to_string(),
        }
    }

    /// `count` records every half hour starting at `start`.
    pub fn half_hourly(start: i64, count: usize) -> Vec<Record> {
        (0..count as i64)
            .map(|i| record_at(start + i * HALF_HOUR))
            .collect()
    }

    /// A store holding [`half_hourly`] records.
    pub fn seeded_store(start: i64, count: usize) -> InMemoryMeasurementStore {
        InMemoryMeasurementStore::with_records(half_hourly(start, count))
    }

    /// Condition catalog JSON covering the ids used by the fixtures.
    pub const CONDITIONS_JSON: &str = r#"{
        "800": {"name": "Clear", "description": "clear sky", "icon": "01"},
        "801": {"name": "Clouds", "description": "few clouds: 11-25%", "icon": "02"},
        "500": {"name": "Rain", "description": "light rain", "icon": "10"}
    }"#;

    pub fn condition_catalog() -> ConditionCatalog {
        ConditionCatalog::from_json(CONDITIONS_JSON).unwrap_or_default()
    }

    /// Owned measure names.
    pub fn measures(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for RAINBBIT-specific validation.

    use super::*;

    /// Assert that a RainbbitResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &RainbbitResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a RainbbitResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &RainbbitResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a result failed input validation.
    #[track_caller]
    pub fn assert_validation_err<T: std::fmt::Debug>(result: &RainbbitResult<T>) {
        assert!(
            matches!(result, Err(RainbbitError::Validation(_))),
            "Expected validation error, got: {:?}",
            result
        );
    }

    /// Assert that points are strictly ordered by timestamp.
    #[track_caller]
    pub fn assert_sorted_by_dt(points: &[DataPoint]) {
        for pair in points.windows(2) {
            assert!(
                pair[0].dt < pair[1].dt,
                "points out of order: {} then {}",
                pair[0].dt,
                pair[1].dt
            );
        }
    }
}
