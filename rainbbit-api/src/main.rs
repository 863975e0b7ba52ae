//! RAINBBIT API Server Entry Point
//!
//! Loads configuration, the condition catalog and the persisted zone, builds
//! the shared state, spawns the background jobs and serves HTTP until
//! Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use rainbbit_api::constants::{DEFAULT_BIND_HOST, DEFAULT_PORT};
use rainbbit_api::jobs::{ingestion_task, sweep_task, IngestionConfig};
use rainbbit_api::telemetry::{init_tracing, TelemetryConfig};
use rainbbit_api::zone::load_zone;
use rainbbit_api::{
    create_api_router, load_condition_catalog, ApiConfig, ApiError, ApiResult, AppState,
    OpenWeatherMapSource, OwmConfig,
};
use rainbbit_core::RainbbitError;
use rainbbit_storage::{InMemoryMeasurementStore, SharedStore};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let owm_config = OwmConfig::from_env()?;

    let catalog = load_condition_catalog(&api_config.conditions_path).await?;
    let zone = load_zone(&api_config.zone_path).await.map_err(|e| {
        ApiError::internal_error(format!(
            "Failed to read zone file {}: {}",
            api_config.zone_path.display(),
            e
        ))
    })?;

    let store: SharedStore = Arc::new(InMemoryMeasurementStore::new());
    let sweep_interval = api_config.sweep_interval;
    let ingest_interval = api_config.ingest_interval();
    let state = AppState::new(store, api_config, catalog, zone).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut jobs = vec![tokio::spawn({
        let state = state.clone();
        let shutdown_rx = shutdown_rx.clone();
        async move {
            sweep_task(state, sweep_interval, shutdown_rx).await;
        }
    })];

    match owm_config {
        Some(owm_config) => {
            let source = OpenWeatherMapSource::new(owm_config).map_err(RainbbitError::from)?;
            let state = state.clone();
            let shutdown_rx = shutdown_rx.clone();
            jobs.push(tokio::spawn(async move {
                ingestion_task(
                    state,
                    Arc::new(source),
                    IngestionConfig::new(ingest_interval),
                    shutdown_rx,
                )
                .await;
            }));
        }
        None => {
            tracing::warn!("OWM_API_KEY not set, ingestion disabled");
        }
    }

    let app = create_api_router(state);
    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting RAINBBIT API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    for job in jobs {
        if let Err(e) = job.await {
            tracing::warn!(error = %e, "Background job ended abnormally");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("RAINBBIT_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("RAINBBIT_API_PORT").ok())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());

    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
