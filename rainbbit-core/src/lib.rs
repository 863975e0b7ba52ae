//! RAINBBIT Core - Weather Types
//!
//! Pure data structures shared by every other crate: observation records,
//! projected data points, window alignment, cache keys and the error
//! taxonomy. No I/O happens here.

pub mod cache_key;
pub mod conditions;
pub mod error;
pub mod record;
pub mod window;

pub use cache_key::{CacheKey, MeasureSet};
pub use conditions::{Condition, ConditionCatalog};
pub use error::{
    ConfigError, IngestError, RainbbitError, RainbbitResult, RenderError, StorageError,
    ValidationError,
};
pub use record::{wind_direction, DataPoint, Record, MAX_PROJECTED_MEASURES, MEASURES};
pub use window::{AlignedWindow, WindowAligner};
