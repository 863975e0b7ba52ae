//! Health Check Endpoints
//!
//! - /health/ping - Liveness check
//! - /health/ready - Measurement store check

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Instant;

static STARTED_AT: Lazy<Instant> = Lazy::new(Instant::now);

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub store: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
    /// Timestamp of the newest stored record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_dt: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping
pub async fn ping() -> impl IntoResponse {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("pong".to_string()),
        details: None,
    })
}

/// GET /health/ready - goes straight to the store, bypassing the caches.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let (store, latest_dt) = match state.store.query_latest_record().await {
        Ok(latest) => (
            ComponentHealth {
                status: HealthStatus::Healthy,
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
            latest.map(|r| r.dt),
        ),
        Err(e) => (
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some(e.to_string()),
            },
            None,
        ),
    };

    let status = store.status;
    let response = HealthResponse {
        status,
        message: None,
        details: Some(HealthDetails {
            store,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: STARTED_AT.elapsed().as_secs(),
            latest_dt,
        }),
    };

    let status_code = if status == HealthStatus::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Lazy::force(&STARTED_AT);
    Router::new()
        .route("/ping", get(ping))
        .route("/ready", get(readiness))
}
