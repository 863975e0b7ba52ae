//! RAINBBIT API - Weather Station HTTP Service
//!
//! Serves stored weather observations as JSON and SVG charts. Requests pass
//! through two-level admission control and are answered from expiring LRU
//! caches in front of the measurement store; a background job ingests a new
//! observation every ingestion interval and refreshes the latest-record
//! slot.

pub mod catalog;
pub mod chart;
pub mod config;
pub mod constants;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod zone;

// Re-export commonly used types
pub use catalog::load_condition_catalog;
pub use chart::{ChartRenderer, ChartSpec, Palette, SvgChartRenderer};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use ingest::{ingest_once, Observation, ObservationSource, OpenWeatherMapSource, OwmConfig};
pub use middleware::{admission_middleware, Admission, AdmissionConfig, AdmissionController};
pub use routes::create_api_router;
pub use state::AppState;
