//! Default configuration values for the RAINBBIT API.

// ============================================================================
// SERVER
// ============================================================================

/// Default bind host.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

// ============================================================================
// INGESTION
// ============================================================================

/// Default ingestion interval (every half hour).
pub const DEFAULT_INGEST_INTERVAL_SECS: i64 = 1800;

/// Upstream current-weather endpoint.
pub const DEFAULT_OWM_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Default unit system requested from the upstream API.
pub const DEFAULT_OWM_UNITS: &str = "metric";

/// Default language for upstream condition descriptions.
pub const DEFAULT_OWM_LANG: &str = "it";

/// Upstream request timeout.
pub const DEFAULT_OWM_TIMEOUT_SECS: u64 = 15;

/// Where the location name is persisted.
pub const DEFAULT_ZONE_PATH: &str = "data/zone";

/// Where the condition catalog is read from.
pub const DEFAULT_CONDITIONS_PATH: &str = "conditions.json";

// ============================================================================
// CACHES
// ============================================================================

pub const DEFAULT_RECORDS_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_RECORDS_CACHE_TTL_SECS: u64 = 600;

/// TTL of the latest-record slot.
pub const DEFAULT_LATEST_TTL_SECS: u64 = 60;

pub const DEFAULT_POINTS_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_POINTS_CACHE_TTL_SECS: u64 = 32 * 60;

pub const DEFAULT_CHART_CACHE_CAPACITY: usize = 64;
pub const DEFAULT_CHART_CACHE_TTL_SECS: u64 = 32 * 60;

/// How often expired cache entries and idle client buckets are swept.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

// ============================================================================
// ADMISSION
// ============================================================================

/// Service-wide sustained rate (requests per second).
pub const DEFAULT_GLOBAL_RATE_PER_SEC: u32 = 100;

/// Service-wide burst.
pub const DEFAULT_GLOBAL_BURST: u32 = 200;

/// Per-client sustained rate (requests per second).
pub const DEFAULT_CLIENT_RATE_PER_SEC: u32 = 3;

/// Per-client burst.
pub const DEFAULT_CLIENT_BURST: u32 = 30;

/// A client bucket unused for this long is dropped.
pub const DEFAULT_CLIENT_IDLE_SECS: u64 = 3600;

/// Maximum number of tracked clients.
pub const DEFAULT_CLIENT_REGISTRY_CAPACITY: usize = 1000;

// ============================================================================
// QUERIES
// ============================================================================

/// Lookback applied when a request carries no `from`.
pub const DEFAULT_LOOKBACK_SECS: i64 = 24 * 3600;
