//! Tracing Subscriber Initialization
//!
//! Structured logs through `tracing-subscriber`, filtered by `RUST_LOG` and
//! written as JSON unless plain text is requested.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "rainbbit_api=debug,rainbbit_storage=info,tower_http=info,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// JSON log lines (`RAINBBIT_LOG_FORMAT` other than "text")
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("RAINBBIT_SERVICE_NAME")
                .unwrap_or_else(|_| "rainbbit-api".to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            json_logs: std::env::var("RAINBBIT_LOG_FORMAT")
                .map(|s| !s.eq_ignore_ascii_case("text"))
                .unwrap_or(true),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup, before anything logs.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(())
}
