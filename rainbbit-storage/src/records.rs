//! Cache-first record reads.

use crate::caches::{CacheSet, RecordList};
use crate::store::SharedStore;
use rainbbit_core::{AlignedWindow, CacheKey, MeasureSet, RainbbitResult, Record};
use std::sync::Arc;

/// Serves record lists and the latest record through the records cache.
#[derive(Clone)]
pub struct RecordReader {
    store: SharedStore,
    caches: Arc<CacheSet>,
}

impl RecordReader {
    pub fn new(store: SharedStore, caches: Arc<CacheSet>) -> Self {
        Self { store, caches }
    }

    /// Every record inside an aligned window.
    pub async fn records(&self, window: AlignedWindow) -> RainbbitResult<RecordList> {
        let key = CacheKey::new(&MeasureSet::All, window);
        self.caches
            .records
            .get_or_try_insert_with(key, || async {
                let records = self.store.query_records(window).await?;
                Ok(Arc::new(records))
            })
            .await
    }

    /// The most recent record, cached under the reserved latest key with its own TTL.
    ///
    /// An empty store is not cached, and neither is a result whose slot was
    /// invalidated while the store was being read.
    pub async fn latest(&self) -> RainbbitResult<Option<Record>> {
        if let Some(cached) = self.caches.records.get(&CacheKey::latest()) {
            return Ok(cached.first().cloned());
        }
        let generation = self.caches.latest_generation();
        let Some(record) = self.store.query_latest_record().await? else {
            return Ok(None);
        };
        if !self.caches.store_latest(record.clone(), generation) {
            tracing::debug!(dt = record.dt, "Latest record invalidated during fill, not cached");
        }
        Ok(Some(record))
    }
}

impl std::fmt::Debug for RecordReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader").finish_non_exhaustive()
    }
}
