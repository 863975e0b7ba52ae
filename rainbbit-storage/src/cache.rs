//! Capacity- and TTL-bounded LRU cache.
//!
//! Each [`ExpiringCache`] owns a single mutex around an [`lru::LruCache`].
//! Expiry is checked lazily on `get` and eagerly by [`ExpiringCache::purge_expired`],
//! which the API layer runs on a timer. The lock is never held across an
//! `.await`: [`ExpiringCache::get_or_try_insert_with`] releases it before
//! running the fill.

use lru::LruCache;
use rainbbit_core::{CacheKey, ConfigError};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Sizing for one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of live entries.
    pub capacity: usize,
    /// Lifetime of an entry, measured from insertion.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl: Duration::from_secs(600),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Check the values, naming the cache in the error.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: format!("{name}.capacity"),
                value: self.capacity.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: format!("{name}.ttl"),
                value: format!("{:?}", self.ttl),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, including expired hits.
    pub misses: u64,
    /// Number of values stored.
    pub inserts: u64,
    /// Number of entries dropped to make room.
    pub evictions: u64,
    /// Number of entries dropped because their TTL elapsed.
    pub expirations: u64,
    /// Number of entries removed by explicit invalidation.
    pub invalidations: u64,
    /// Number of entries currently held (expired ones not yet swept included).
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    invalidations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

/// Key-value store holding at most `capacity` entries, each for at most its TTL.
pub struct ExpiringCache<V> {
    name: &'static str,
    ttl: Duration,
    capacity: NonZeroUsize,
    entries: Mutex<LruCache<CacheKey, Entry<V>>>,
    counters: Counters,
}

impl<V: Clone> ExpiringCache<V> {
    /// Build a cache from a validated config.
    pub fn new(name: &'static str, config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate(name)?;
        let capacity = NonZeroUsize::new(config.capacity).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: format!("{name}.capacity"),
                value: config.capacity.to_string(),
                reason: "must be greater than zero".to_string(),
            }
        })?;
        Ok(Self {
            name,
            ttl: config.ttl,
            capacity,
            entries: Mutex::new(LruCache::new(capacity)),
            counters: Counters::default(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Look up a live entry and mark it most recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            None => {
                Counters::bump(&self.counters.misses, 1);
                return None;
            }
            Some(entry) if !entry.is_expired(now) => {
                Counters::bump(&self.counters.hits, 1);
                return Some(entry.value.clone());
            }
            Some(_) => {}
        }
        entries.pop(key);
        Counters::bump(&self.counters.expirations, 1);
        Counters::bump(&self.counters.misses, 1);
        None
    }

    /// Store a value with the cache's TTL, overwriting any previous value.
    pub fn insert(&self, key: CacheKey, value: V) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    /// Store a value with its own TTL.
    ///
    /// When the cache is full, expired entries are dropped first; if it is
    /// still full the least recently used entry is evicted.
    pub fn insert_with_ttl(&self, key: CacheKey, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.lock();
        if !entries.contains(&key) && entries.len() >= self.capacity.get() {
            let purged = Self::purge_locked(&mut entries, now);
            Counters::bump(&self.counters.expirations, purged as u64);
        }
        let entry = Entry {
            value,
            inserted_at: now,
            ttl,
        };
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                Counters::bump(&self.counters.evictions, 1);
                tracing::trace!(cache = self.name, key = %evicted, "Evicted least recently used entry");
            }
        }
        Counters::bump(&self.counters.inserts, 1);
    }

    /// Remove an entry. Returns whether anything was removed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.lock().pop(key).is_some();
        if removed {
            Counters::bump(&self.counters.invalidations, 1);
        }
        removed
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let purged = Self::purge_locked(&mut self.lock(), now);
        Counters::bump(&self.counters.expirations, purged as u64);
        purged
    }

    /// Return the cached value for `key`, or run `compute` and cache its result.
    ///
    /// The lock is released while `compute` runs, so concurrent misses on the
    /// same key may both compute; the last one to finish wins. Errors are
    /// returned as is and leave the cache untouched.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: CacheKey, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entry_count = self.len() as u64;
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            entry_count,
        }
    }

    fn purge_locked(entries: &mut LruCache<CacheKey, Entry<V>>, now: Instant) -> usize {
        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    // Every mutation completes inside one lock scope, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> std::fmt::Debug for ExpiringCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
