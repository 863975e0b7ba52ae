//! RAINBBIT Storage
//!
//! The measurement store trait with its in-memory implementation, the
//! expiring LRU caches that sit in front of it, and the cache-first readers
//! built on both: [`RecordReader`] for raw records, [`DataPointProjector`]
//! for per-measure series. [`Invalidator`] keeps the latest-record slot
//! fresh after ingestion.

pub mod cache;
pub mod caches;
pub mod invalidator;
pub mod projector;
pub mod records;
pub mod store;

pub use cache::{CacheConfig, CacheStats, ExpiringCache};
pub use caches::{CacheSet, CacheSetConfig, ChartBytes, PointSeries, RecordList};
pub use invalidator::Invalidator;
pub use projector::DataPointProjector;
pub use records::RecordReader;
pub use store::{InMemoryMeasurementStore, MeasurementStore, SharedStore};
