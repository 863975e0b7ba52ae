//! Cache invalidation driven by ingestion.

use crate::caches::CacheSet;
use rainbbit_core::Record;
use std::sync::Arc;

/// Evicts entries made stale by a newly persisted record.
///
/// Only the latest-record slot is dropped. Windows with an open upper bound
/// keep serving their cached value until their TTL runs out.
#[derive(Debug, Clone)]
pub struct Invalidator {
    caches: Arc<CacheSet>,
}

impl Invalidator {
    pub fn new(caches: Arc<CacheSet>) -> Self {
        Self { caches }
    }

    /// Call once per successfully persisted record.
    pub fn on_ingested(&self, record: &Record) {
        let evicted = self.caches.invalidate_latest();
        tracing::debug!(dt = record.dt, evicted, "Invalidated latest record");
    }
}
