//! Prometheus Metrics Definitions
//!
//! Defines all RAINBBIT metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge_vec, CounterVec, Encoder,
    HistogramVec, IntGaugeVec, TextEncoder,
};
use rainbbit_storage::CacheSet;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<RainbbitMetrics>> = Lazy::new(RainbbitMetrics::new);

/// Container for all RAINBBIT metrics.
#[derive(Clone)]
pub struct RainbbitMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Rejected requests - labels: level (global/client)
    pub admission_rejections_total: CounterVec,

    /// Ingestion runs - labels: outcome (success/failure)
    pub ingestion_runs_total: CounterVec,

    /// Cache counters sampled at scrape time - labels: cache
    pub cache_hits: IntGaugeVec,
    pub cache_misses: IntGaugeVec,
    pub cache_evictions: IntGaugeVec,
    pub cache_entries: IntGaugeVec,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl RainbbitMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "rainbbit_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "rainbbit_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            admission_rejections_total: register_counter_vec!(
                "rainbbit_admission_rejections_total",
                "Requests rejected by admission control",
                &["level"]
            )
            .map_err(|e| registration_error("admission_rejections_total", e))?,

            ingestion_runs_total: register_counter_vec!(
                "rainbbit_ingestion_runs_total",
                "Ingestion runs by outcome",
                &["outcome"]
            )
            .map_err(|e| registration_error("ingestion_runs_total", e))?,

            cache_hits: register_int_gauge_vec!(
                "rainbbit_cache_hits",
                "Cache hits since startup",
                &["cache"]
            )
            .map_err(|e| registration_error("cache_hits", e))?,

            cache_misses: register_int_gauge_vec!(
                "rainbbit_cache_misses",
                "Cache misses since startup",
                &["cache"]
            )
            .map_err(|e| registration_error("cache_misses", e))?,

            cache_evictions: register_int_gauge_vec!(
                "rainbbit_cache_evictions",
                "Capacity evictions since startup",
                &["cache"]
            )
            .map_err(|e| registration_error("cache_evictions", e))?,

            cache_entries: register_int_gauge_vec!(
                "rainbbit_cache_entries",
                "Entries currently held",
                &["cache"]
            )
            .map_err(|e| registration_error("cache_entries", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_admission_rejection(&self, level: &str) {
        self.admission_rejections_total
            .with_label_values(&[level])
            .inc();
    }

    pub fn record_ingestion(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.ingestion_runs_total.with_label_values(&[outcome]).inc();
    }

    /// Copy the caches' own counters into the cache gauges.
    pub fn observe_caches(&self, caches: &CacheSet) {
        for (name, stats) in caches.stats() {
            self.cache_hits
                .with_label_values(&[name])
                .set(saturating_i64(stats.hits));
            self.cache_misses
                .with_label_values(&[name])
                .set(saturating_i64(stats.misses));
            self.cache_evictions
                .with_label_values(&[name])
                .set(saturating_i64(stats.evictions));
            self.cache_entries
                .with_label_values(&[name])
                .set(saturating_i64(stats.entry_count));
        }
    }
}

/// Count a rejected request, if metrics are available.
pub fn record_admission_rejection(level: &str) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_admission_rejection(level);
    }
}

/// Count an ingestion run, if metrics are available.
pub fn record_ingestion(success: bool) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_ingestion(success);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.observe_caches(&state.caches);
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
