//! Cache-first projection and record reads against counting and failing stores.

use rainbbit_core::{AlignedWindow, WindowAligner};
use rainbbit_storage::{
    CacheConfig, CacheSet, CacheSetConfig, DataPointProjector, RecordReader, SharedStore,
};
use rainbbit_test_utils::assertions::{assert_sorted_by_dt, assert_validation_err};
use rainbbit_test_utils::fixtures::{measures, seeded_store, HALF_HOUR};
use rainbbit_test_utils::{CountingStore, FlakyStore, RainbbitError, ValidationError};
use std::sync::Arc;
use std::time::Duration;

fn caches() -> Arc<CacheSet> {
    let config = CacheSetConfig {
        points: CacheConfig::new()
            .with_capacity(8)
            .with_ttl(Duration::from_secs(600)),
        ..CacheSetConfig::default()
    };
    Arc::new(CacheSet::new(config).unwrap())
}

async fn counting_projector() -> (Arc<CountingStore>, DataPointProjector) {
    let store = Arc::new(CountingStore::new(seeded_store(0, 10)));
    let shared: SharedStore = store.clone();
    let projector = DataPointProjector::load(shared, caches()).await.unwrap();
    (store, projector)
}

#[tokio::test]
async fn projection_fills_cache_once() {
    let (store, projector) = counting_projector().await;
    let aligner = WindowAligner::new(HALF_HOUR).unwrap();
    let window = aligner.align(Some(1000), Some(5000));
    let temp = measures(&["temp", "temp_min"]);

    let first = projector.project(&temp, window).await.unwrap();
    let second = projector.project(&temp, window).await.unwrap();

    assert_eq!(store.projection_queries(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    // 0, 1800, 3600, 5400
    assert_eq!(first.len(), 4);
    assert_sorted_by_dt(&first);
    assert_eq!(first[1].values[..2], [11.0, 9.0]);
}

#[tokio::test]
async fn nearby_requests_share_an_aligned_entry() {
    let (store, projector) = counting_projector().await;
    let aligner = WindowAligner::new(HALF_HOUR).unwrap();
    let temp = measures(&["temp"]);

    projector
        .project(&temp, aligner.align(Some(1000), Some(5000)))
        .await
        .unwrap();
    projector
        .project(&temp, aligner.align(Some(1200), Some(5300)))
        .await
        .unwrap();

    assert_eq!(store.projection_queries(), 1);
}

#[tokio::test]
async fn measure_order_is_part_of_the_key() {
    let (store, projector) = counting_projector().await;
    let window = AlignedWindow::WHOLE_HISTORY;

    let ab = projector
        .project(&measures(&["temp", "pressure"]), window)
        .await
        .unwrap();
    let ba = projector
        .project(&measures(&["pressure", "temp"]), window)
        .await
        .unwrap();

    assert_eq!(store.projection_queries(), 2);
    assert_eq!(ab[0].values[0], ba[0].values[1]);
}

#[tokio::test]
async fn invalid_requests_never_reach_storage() {
    let (store, projector) = counting_projector().await;
    let window = AlignedWindow::WHOLE_HISTORY;

    let unknown = projector.project(&measures(&["temp", "dew"]), window).await;
    assert_validation_err(&unknown);
    assert!(matches!(
        unknown,
        Err(RainbbitError::Validation(ValidationError::UnknownMeasure { ref measure })) if measure == "dew"
    ));

    let six = measures(&["temp", "temp_min", "temp_max", "feels_like", "pressure", "humidity"]);
    let too_many = projector.project(&six, window).await;
    assert!(matches!(
        too_many,
        Err(RainbbitError::Validation(ValidationError::TooManyMeasures { requested: 6, max: 5 }))
    ));

    assert_validation_err(&projector.project(&[], window).await);
    assert_eq!(store.projection_queries(), 0);
}

#[tokio::test]
async fn five_measures_are_allowed() {
    let (_, projector) = counting_projector().await;
    let five = measures(&["temp", "temp_min", "temp_max", "feels_like", "pressure"]);
    let points = projector
        .project(&five, AlignedWindow::WHOLE_HISTORY)
        .await
        .unwrap();
    assert_eq!(points.len(), 10);
    assert!(points.iter().all(|p| p.values[4] >= 1000.0));
}

#[tokio::test]
async fn storage_failure_is_not_cached() {
    let store = Arc::new(FlakyStore::new(seeded_store(0, 4)));
    let shared: SharedStore = store.clone();
    let caches = caches();
    let projector = DataPointProjector::load(shared, caches.clone())
        .await
        .unwrap();
    let temp = measures(&["temp"]);

    store.set_failing(true);
    let failed = projector.project(&temp, AlignedWindow::WHOLE_HISTORY).await;
    assert!(matches!(failed, Err(RainbbitError::Storage(_))));
    assert!(caches.points.is_empty());

    store.set_failing(false);
    let points = projector
        .project(&temp, AlignedWindow::WHOLE_HISTORY)
        .await
        .unwrap();
    assert_eq!(points.len(), 4);
    assert_eq!(store.queries(), 2);
    assert_eq!(caches.points.len(), 1);
}

#[tokio::test]
async fn record_reads_are_cached_per_window() {
    let store = Arc::new(CountingStore::new(seeded_store(0, 6)));
    let shared: SharedStore = store.clone();
    let reader = RecordReader::new(shared, caches());
    let window = AlignedWindow {
        from: Some(1800),
        to: Some(5400),
    };

    let first = reader.records(window).await.unwrap();
    let again = reader.records(window).await.unwrap();
    let all = reader.records(AlignedWindow::WHOLE_HISTORY).await.unwrap();

    assert_eq!(first.len(), 3);
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(all.len(), 6);
    assert_eq!(store.record_queries(), 2);
}

#[tokio::test]
async fn empty_store_latest_is_not_cached() {
    let store = Arc::new(CountingStore::default());
    let shared: SharedStore = store.clone();
    let reader = RecordReader::new(shared, caches());

    assert!(reader.latest().await.unwrap().is_none());
    assert!(reader.latest().await.unwrap().is_none());
    assert_eq!(store.latest_queries(), 2);
}
