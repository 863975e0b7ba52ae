//! API Configuration Module
//!
//! Server, cache sizing, admission control and CORS settings. Configuration
//! is loaded from environment variables with defaults suited to a single
//! small station, and validated once at startup.

use crate::constants::*;
use crate::middleware::AdmissionConfig;
use rainbbit_core::{ConfigError, WindowAligner};
use rainbbit_storage::{CacheConfig, CacheSetConfig};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Process-wide configuration for the RAINBBIT API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Ingestion
    // ========================================================================
    /// Ingestion interval in seconds. Windows are aligned to multiples of it.
    pub ingest_interval_secs: i64,

    /// File the location name is persisted to.
    pub zone_path: PathBuf,

    /// JSON condition catalog.
    pub conditions_path: PathBuf,

    // ========================================================================
    // Caches
    // ========================================================================
    pub records_cache_capacity: usize,
    pub records_cache_ttl: Duration,

    /// TTL of the latest-record slot.
    pub latest_ttl: Duration,

    pub points_cache_capacity: usize,
    pub points_cache_ttl: Duration,

    pub chart_cache_capacity: usize,
    pub chart_cache_ttl: Duration,

    /// Period of the background sweep.
    pub sweep_interval: Duration,

    // ========================================================================
    // Admission Control
    // ========================================================================
    /// Whether admission control is enabled.
    pub rate_limit_enabled: bool,

    pub global_rate_per_sec: u32,
    pub global_burst: u32,

    pub client_rate_per_sec: u32,
    pub client_burst: u32,

    /// Idle window after which a client bucket is dropped.
    pub client_idle: Duration,

    /// Maximum number of tracked client buckets.
    pub client_registry_capacity: usize,

    /// Identify clients by `X-Forwarded-For` / `X-Real-IP` instead of the
    /// socket peer. Only enable behind a trusted proxy.
    pub trust_forwarded_headers: bool,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins.
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            ingest_interval_secs: DEFAULT_INGEST_INTERVAL_SECS,
            zone_path: PathBuf::from(DEFAULT_ZONE_PATH),
            conditions_path: PathBuf::from(DEFAULT_CONDITIONS_PATH),

            records_cache_capacity: DEFAULT_RECORDS_CACHE_CAPACITY,
            records_cache_ttl: Duration::from_secs(DEFAULT_RECORDS_CACHE_TTL_SECS),
            latest_ttl: Duration::from_secs(DEFAULT_LATEST_TTL_SECS),
            points_cache_capacity: DEFAULT_POINTS_CACHE_CAPACITY,
            points_cache_ttl: Duration::from_secs(DEFAULT_POINTS_CACHE_TTL_SECS),
            chart_cache_capacity: DEFAULT_CHART_CACHE_CAPACITY,
            chart_cache_ttl: Duration::from_secs(DEFAULT_CHART_CACHE_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),

            rate_limit_enabled: true,
            global_rate_per_sec: DEFAULT_GLOBAL_RATE_PER_SEC,
            global_burst: DEFAULT_GLOBAL_BURST,
            client_rate_per_sec: DEFAULT_CLIENT_RATE_PER_SEC,
            client_burst: DEFAULT_CLIENT_BURST,
            client_idle: Duration::from_secs(DEFAULT_CLIENT_IDLE_SECS),
            client_registry_capacity: DEFAULT_CLIENT_REGISTRY_CAPACITY,
            trust_forwarded_headers: false,

            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
        }
    }
}

/// Parse `name` with `lookup`, falling back to `default` when it is absent.
/// A value that is present but does not parse is an error.
fn var_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: name.to_string(),
            value: raw.clone(),
            reason: format!("expected {}", std::any::type_name::<T>()),
        }),
    }
}

fn secs_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    var_or(lookup, name, default).map(Duration::from_secs)
}

fn flag_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name).map(|s| s.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" => Ok(true),
        Some(v) if v == "false" => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue {
            field: name.to_string(),
            value: v,
            reason: "expected \"true\" or \"false\"".to_string(),
        }),
    }
}

fn path_or(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: PathBuf) -> PathBuf {
    lookup(name)
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables (all optional):
    /// - `RAINBBIT_INGEST_INTERVAL_SECS` (default: 1800)
    /// - `RAINBBIT_ZONE_PATH` (default: data/zone)
    /// - `RAINBBIT_CONDITIONS_PATH` (default: conditions.json)
    /// - `RAINBBIT_RECORDS_CACHE_CAPACITY` / `RAINBBIT_RECORDS_CACHE_TTL_SECS` (256 / 600)
    /// - `RAINBBIT_LATEST_TTL_SECS` (60)
    /// - `RAINBBIT_POINTS_CACHE_CAPACITY` / `RAINBBIT_POINTS_CACHE_TTL_SECS` (256 / 1920)
    /// - `RAINBBIT_CHART_CACHE_CAPACITY` / `RAINBBIT_CHART_CACHE_TTL_SECS` (64 / 1920)
    /// - `RAINBBIT_CACHE_SWEEP_INTERVAL_SECS` (60)
    /// - `RAINBBIT_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `RAINBBIT_GLOBAL_RATE_PER_SEC` / `RAINBBIT_GLOBAL_BURST` (100 / 200)
    /// - `RAINBBIT_CLIENT_RATE_PER_SEC` / `RAINBBIT_CLIENT_BURST` (3 / 30)
    /// - `RAINBBIT_CLIENT_IDLE_SECS` (3600)
    /// - `RAINBBIT_CLIENT_REGISTRY_CAPACITY` (1000)
    /// - `RAINBBIT_TRUST_FORWARDED_HEADERS`: "true" or "false" (default: false)
    /// - `RAINBBIT_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `RAINBBIT_CORS_MAX_AGE_SECS` (86400)
    ///
    /// A variable that is set but does not parse is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let lookup = &lookup;

        let cors_origins = lookup("RAINBBIT_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            ingest_interval_secs: var_or(
                lookup,
                "RAINBBIT_INGEST_INTERVAL_SECS",
                DEFAULT_INGEST_INTERVAL_SECS,
            )?,
            zone_path: path_or(lookup, "RAINBBIT_ZONE_PATH", defaults.zone_path),
            conditions_path: path_or(lookup, "RAINBBIT_CONDITIONS_PATH", defaults.conditions_path),

            records_cache_capacity: var_or(
                lookup,
                "RAINBBIT_RECORDS_CACHE_CAPACITY",
                DEFAULT_RECORDS_CACHE_CAPACITY,
            )?,
            records_cache_ttl: secs_or(
                lookup,
                "RAINBBIT_RECORDS_CACHE_TTL_SECS",
                DEFAULT_RECORDS_CACHE_TTL_SECS,
            )?,
            latest_ttl: secs_or(lookup, "RAINBBIT_LATEST_TTL_SECS", DEFAULT_LATEST_TTL_SECS)?,
            points_cache_capacity: var_or(
                lookup,
                "RAINBBIT_POINTS_CACHE_CAPACITY",
                DEFAULT_POINTS_CACHE_CAPACITY,
            )?,
            points_cache_ttl: secs_or(
                lookup,
                "RAINBBIT_POINTS_CACHE_TTL_SECS",
                DEFAULT_POINTS_CACHE_TTL_SECS,
            )?,
            chart_cache_capacity: var_or(
                lookup,
                "RAINBBIT_CHART_CACHE_CAPACITY",
                DEFAULT_CHART_CACHE_CAPACITY,
            )?,
            chart_cache_ttl: secs_or(
                lookup,
                "RAINBBIT_CHART_CACHE_TTL_SECS",
                DEFAULT_CHART_CACHE_TTL_SECS,
            )?,
            sweep_interval: secs_or(
                lookup,
                "RAINBBIT_CACHE_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?,

            rate_limit_enabled: flag_or(lookup, "RAINBBIT_RATE_LIMIT_ENABLED", true)?,
            global_rate_per_sec: var_or(
                lookup,
                "RAINBBIT_GLOBAL_RATE_PER_SEC",
                DEFAULT_GLOBAL_RATE_PER_SEC,
            )?,
            global_burst: var_or(lookup, "RAINBBIT_GLOBAL_BURST", DEFAULT_GLOBAL_BURST)?,
            client_rate_per_sec: var_or(
                lookup,
                "RAINBBIT_CLIENT_RATE_PER_SEC",
                DEFAULT_CLIENT_RATE_PER_SEC,
            )?,
            client_burst: var_or(lookup, "RAINBBIT_CLIENT_BURST", DEFAULT_CLIENT_BURST)?,
            client_idle: secs_or(lookup, "RAINBBIT_CLIENT_IDLE_SECS", DEFAULT_CLIENT_IDLE_SECS)?,
            client_registry_capacity: var_or(
                lookup,
                "RAINBBIT_CLIENT_REGISTRY_CAPACITY",
                DEFAULT_CLIENT_REGISTRY_CAPACITY,
            )?,
            trust_forwarded_headers: flag_or(lookup, "RAINBBIT_TRUST_FORWARDED_HEADERS", false)?,

            cors_origins,
            cors_max_age_secs: var_or(
                lookup,
                "RAINBBIT_CORS_MAX_AGE_SECS",
                defaults.cors_max_age_secs,
            )?,
        })
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window_aligner()?;
        self.cache_set_config().validate()?;
        self.admission_config().validate()?;
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn window_aligner(&self) -> Result<WindowAligner, ConfigError> {
        WindowAligner::new(self.ingest_interval_secs)
    }

    /// Ingestion interval as a duration. Non-positive intervals are rejected
    /// by [`ApiConfig::validate`].
    pub fn ingest_interval(&self) -> Duration {
        Duration::from_secs(self.ingest_interval_secs.max(1).unsigned_abs())
    }

    pub fn cache_set_config(&self) -> CacheSetConfig {
        CacheSetConfig {
            records: CacheConfig::new()
                .with_capacity(self.records_cache_capacity)
                .with_ttl(self.records_cache_ttl),
            latest_ttl: self.latest_ttl,
            points: CacheConfig::new()
                .with_capacity(self.points_cache_capacity)
                .with_ttl(self.points_cache_ttl),
            charts: CacheConfig::new()
                .with_capacity(self.chart_cache_capacity)
                .with_ttl(self.chart_cache_ttl),
        }
    }

    pub fn admission_config(&self) -> AdmissionConfig {
        AdmissionConfig {
            global_rate_per_sec: self.global_rate_per_sec,
            global_burst: self.global_burst,
            client_rate_per_sec: self.client_rate_per_sec,
            client_burst: self.client_burst,
            client_idle: self.client_idle,
            registry_capacity: self.client_registry_capacity,
        }
    }
}
