//! The three process-wide cache instances.

use crate::cache::{CacheConfig, CacheStats, ExpiringCache};
use rainbbit_core::{CacheKey, ConfigError, DataPoint, Record};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Cached list of records. The latest-record slot holds a one-element list.
pub type RecordList = Arc<Vec<Record>>;
/// Cached projection result.
pub type PointSeries = Arc<Vec<DataPoint>>;
/// Cached rendered chart.
pub type ChartBytes = Arc<Vec<u8>>;

/// Sizing for every cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSetConfig {
    pub records: CacheConfig,
    /// TTL of the latest-record slot inside the records cache.
    pub latest_ttl: Duration,
    pub points: CacheConfig,
    pub charts: CacheConfig,
}

impl Default for CacheSetConfig {
    fn default() -> Self {
        Self {
            records: CacheConfig::new()
                .with_capacity(256)
                .with_ttl(Duration::from_secs(600)),
            latest_ttl: Duration::from_secs(60),
            points: CacheConfig::new()
                .with_capacity(256)
                .with_ttl(Duration::from_secs(32 * 60)),
            charts: CacheConfig::new()
                .with_capacity(64)
                .with_ttl(Duration::from_secs(32 * 60)),
        }
    }
}

impl CacheSetConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.records.validate("records")?;
        self.points.validate("points")?;
        self.charts.validate("charts")?;
        if self.latest_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "records.latest_ttl".to_string(),
                value: format!("{:?}", self.latest_ttl),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Independently sized caches for records, data points and charts.
#[derive(Debug)]
pub struct CacheSet {
    pub records: ExpiringCache<RecordList>,
    pub points: ExpiringCache<PointSeries>,
    pub charts: ExpiringCache<ChartBytes>,
    latest_ttl: Duration,
    /// Bumped on every latest-slot invalidation. A fill that started under
    /// an older generation must not be stored.
    latest_generation: Mutex<u64>,
}

impl CacheSet {
    pub fn new(config: CacheSetConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            records: ExpiringCache::new("records", config.records)?,
            points: ExpiringCache::new("points", config.points)?,
            charts: ExpiringCache::new("charts", config.charts)?,
            latest_ttl: config.latest_ttl,
            latest_generation: Mutex::new(0),
        })
    }

    pub fn latest_ttl(&self) -> Duration {
        self.latest_ttl
    }

    fn generation(&self) -> MutexGuard<'_, u64> {
        self.latest_generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Generation to pass to [`CacheSet::store_latest`] once the fill is done.
    pub fn latest_generation(&self) -> u64 {
        *self.generation()
    }

    /// Cache `record` in the latest slot unless the slot was invalidated
    /// since `generation` was read. Returns whether it was stored.
    pub fn store_latest(&self, record: Record, generation: u64) -> bool {
        let current = self.generation();
        if *current != generation {
            return false;
        }
        self.records
            .insert_with_ttl(CacheKey::latest(), Arc::new(vec![record]), self.latest_ttl);
        true
    }

    /// Drop the latest slot and retire every fill already in flight.
    pub fn invalidate_latest(&self) -> bool {
        let mut current = self.generation();
        *current = current.wrapping_add(1);
        self.records.invalidate(&CacheKey::latest())
    }

    /// Sweep expired entries from every instance, one lock at a time.
    pub fn purge_expired(&self) -> usize {
        self.records.purge_expired() + self.points.purge_expired() + self.charts.purge_expired()
    }

    /// `(name, stats)` for every instance.
    pub fn stats(&self) -> [(&'static str, CacheStats); 3] {
        [
            (self.records.name(), self.records.stats()),
            (self.points.name(), self.points.stats()),
            (self.charts.name(), self.charts.stats()),
        ]
    }
}
