//! RAINBBIT Telemetry - Observability Infrastructure
//!
//! Structured logging and Prometheus metrics for the API layer.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{
    metrics_handler, record_admission_rejection, record_ingestion, RainbbitMetrics, METRICS,
};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, TelemetryConfig};
