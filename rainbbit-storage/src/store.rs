//! Measurement storage trait and the in-memory implementation.

use async_trait::async_trait;
use rainbbit_core::{
    AlignedWindow, DataPoint, RainbbitError, RainbbitResult, Record, StorageError,
    ValidationError, MAX_PROJECTED_MEASURES, MEASURES,
};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Persistence for weather records.
///
/// Windows are inclusive on both ends; an open bound matches everything on
/// that side. Results are ordered by `dt`.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// All records inside `window`.
    async fn query_records(&self, window: AlignedWindow) -> RainbbitResult<Vec<Record>>;

    /// The record with the greatest `dt`, if any.
    async fn query_latest_record(&self) -> RainbbitResult<Option<Record>>;

    /// One data point per record inside `window`, carrying `columns` in order.
    async fn query_projection(
        &self,
        columns: &[String],
        window: AlignedWindow,
    ) -> RainbbitResult<Vec<DataPoint>>;

    /// Names of the columns that can be projected.
    async fn known_measure_names(&self) -> RainbbitResult<Vec<String>>;

    /// Persist a new record. Fails if a record with the same `dt` exists.
    async fn insert_record(&self, record: Record) -> RainbbitResult<()>;
}

/// Shared handle to a store.
pub type SharedStore = Arc<dyn MeasurementStore>;

/// In-memory store keyed by `dt`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMeasurementStore {
    records: Arc<RwLock<BTreeMap<i64, Record>>>,
}

impl InMemoryMeasurementStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with records. Later duplicates replace earlier ones.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let map = records.into_iter().map(|r| (r.dt, r)).collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> RainbbitResult<usize> {
        let records = self
            .records
            .read()
            .map_err(|_| RainbbitError::Storage(StorageError::LockPoisoned))?;
        Ok(records.len())
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> RainbbitResult<bool> {
        Ok(self.len()? == 0)
    }

    fn scan<T>(
        &self,
        window: AlignedWindow,
        f: impl Fn(&Record) -> T,
    ) -> RainbbitResult<Vec<T>> {
        let records = self
            .records
            .read()
            .map_err(|_| RainbbitError::Storage(StorageError::LockPoisoned))?;
        let lower = window.from.unwrap_or(i64::MIN);
        let upper = window.to.unwrap_or(i64::MAX);
        if lower > upper {
            return Ok(Vec::new());
        }
        Ok(records.range(lower..=upper).map(|(_, r)| f(r)).collect())
    }
}

#[async_trait]
impl MeasurementStore for InMemoryMeasurementStore {
    async fn query_records(&self, window: AlignedWindow) -> RainbbitResult<Vec<Record>> {
        self.scan(window, Record::clone)
    }

    async fn query_latest_record(&self) -> RainbbitResult<Option<Record>> {
        let records = self
            .records
            .read()
            .map_err(|_| RainbbitError::Storage(StorageError::LockPoisoned))?;
        Ok(records.values().next_back().cloned())
    }

    async fn query_projection(
        &self,
        columns: &[String],
        window: AlignedWindow,
    ) -> RainbbitResult<Vec<DataPoint>> {
        if columns.len() > MAX_PROJECTED_MEASURES {
            return Err(ValidationError::TooManyMeasures {
                requested: columns.len(),
                max: MAX_PROJECTED_MEASURES,
            }
            .into());
        }
        if let Some(column) = columns.iter().find(|c| !MEASURES.contains(&c.as_str())) {
            return Err(StorageError::UnknownColumn {
                column: column.clone(),
            }
            .into());
        }
        self.scan(window, |r| DataPoint::project(r, columns))
    }

    async fn known_measure_names(&self) -> RainbbitResult<Vec<String>> {
        Ok(MEASURES.iter().map(|m| m.to_string()).collect())
    }

    async fn insert_record(&self, record: Record) -> RainbbitResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RainbbitError::Storage(StorageError::LockPoisoned))?;
        if records.contains_key(&record.dt) {
            return Err(StorageError::InsertFailed {
                dt: record.dt,
                reason: "already exists".to_string(),
            }
            .into());
        }
        records.insert(record.dt, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(dt: i64, temp: f64) -> Record {
        Record {
            dt,
            temp,
            pressure: 1000.0 + temp,
            ..Default::default()
        }
    }

    fn store() -> InMemoryMeasurementStore {
        InMemoryMeasurementStore::with_records([
            record(1800, 10.0),
            record(3600, 11.0),
            record(5400, 12.0),
            record(7200, 13.0),
        ])
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let window = AlignedWindow {
            from: Some(3600),
            to: Some(5400),
        };
        let records = store().query_records(window).await.unwrap();
        let dts: Vec<i64> = records.iter().map(|r| r.dt).collect();
        assert_eq!(dts, vec![3600, 5400]);
    }

    #[tokio::test]
    async fn open_bounds_match_everything() {
        let store = store();
        let all = store
            .query_records(AlignedWindow::WHOLE_HISTORY)
            .await
            .unwrap();
        assert_eq!(all.len(), 4);

        let tail = store
            .query_records(AlignedWindow {
                from: Some(5000),
                to: None,
            })
            .await
            .unwrap();
        assert_eq!(tail.len(), 2);
    }

    #[tokio::test]
    async fn inverted_window_is_empty() {
        let window = AlignedWindow {
            from: Some(7200),
            to: Some(0),
        };
        assert!(store().query_records(window).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_is_greatest_dt() {
        let latest = store().query_latest_record().await.unwrap().unwrap();
        assert_eq!(latest.dt, 7200);
        let empty = InMemoryMeasurementStore::new();
        assert!(empty.query_latest_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn projection_follows_column_order() {
        let columns = vec!["pressure".to_string(), "temp".to_string()];
        let points = store()
            .query_projection(&columns, AlignedWindow::WHOLE_HISTORY)
            .await
            .unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].dt, 1800);
        assert_eq!(points[0].values[..2], [1010.0, 10.0]);
    }

    #[tokio::test]
    async fn projection_rejects_unknown_column() {
        let columns = vec!["dt; drop".to_string()];
        let err = store()
            .query_projection(&columns, AlignedWindow::WHOLE_HISTORY)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RainbbitError::Storage(StorageError::UnknownColumn { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let store = store();
        store.insert_record(record(9000, 1.0)).await.unwrap();
        assert_eq!(store.len().unwrap(), 5);
        let err = store.insert_record(record(9000, 2.0)).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
