//! HTTP routes for the RAINBBIT API.
//!
//! - `records`: raw records, latest record, projected series, metadata
//! - `charts`: SVG charts
//! - `health`: liveness and readiness

pub mod charts;
pub mod health;
pub mod records;

use crate::config::ApiConfig;
use crate::constants::DEFAULT_LOOKBACK_SECS;
use crate::middleware::admission_middleware;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use rainbbit_core::{AlignedWindow, WindowAligner};
use serde::Deserialize;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

/// `from`, `to` and `theme` query parameters shared by the window endpoints.
///
/// Bounds are Unix seconds. Values that do not parse are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub theme: Option<String>,
}

fn parse_bound(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse().ok())
}

impl WindowQuery {
    /// Aligned window for this query at time `now`.
    ///
    /// A missing `from` means the last 24 hours; a missing `to` leaves the
    /// window open. `from=0&to=0` selects the whole history.
    pub fn window(&self, aligner: &WindowAligner, now: i64) -> AlignedWindow {
        let to = parse_bound(self.to.as_deref());
        let from = parse_bound(self.from.as_deref())
            .or_else(|| Some(now.saturating_sub(DEFAULT_LOOKBACK_SECS)));
        aligner.align(from, to)
    }
}

pub(crate) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============================================================================
// ROUTER
// ============================================================================

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([HeaderName::from_static("retry-after")])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Create the complete router.
///
/// Layers, outermost first: CORS, HTTP trace, request metrics, admission
/// control. Admission applies to every route.
pub fn create_api_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/records", get(records::list_records))
        .route("/latest", get(records::latest_record))
        .route("/series", get(records::series))
        .route("/meta", get(records::meta))
        .route("/conditions", get(records::conditions))
        .route("/plot/:measure", get(charts::plot_measure))
        .route("/temp", get(charts::plot_temperature))
        .route("/pressure", get(charts::plot_pressure));

    let cors = build_cors_layer(&state.config);

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .layer(from_fn_with_state(state.clone(), admission_middleware))
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
