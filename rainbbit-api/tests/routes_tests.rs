//! Router-level tests for the record, series, chart and health endpoints.

mod support;

use axum::http::{header, StatusCode};
use rainbbit_api::create_api_router;
use rainbbit_storage::{InMemoryMeasurementStore, SharedStore};
use rainbbit_test_utils::fixtures::{seeded_store, HALF_HOUR};
use rainbbit_test_utils::{CountingStore, FlakyStore};
use std::sync::Arc;
use support::*;

fn window_query(count: i64) -> String {
    format!("from={}&to={}", START, START + (count - 1) * HALF_HOUR)
}

#[tokio::test]
async fn records_include_resolved_conditions() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(seeded_store(START, 4));
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    let response = send(&app, get(&format!("/api/records?{}", window_query(4)))).await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0]["dt"], START);
    assert_eq!(records[0]["weather"], "800");
    assert_eq!(records[0]["conditions"][0]["name"], "Clear");
    assert_eq!(records[0]["conditions"][0]["icon"], "01d");
    assert_eq!(records[0]["wind_direction"], "→");
}

#[tokio::test]
async fn records_are_served_from_cache() {
    let dir = temp_dir();
    let store = Arc::new(CountingStore::new(seeded_store(START, 4)));
    let app = create_api_router(build_state(store.clone(), test_config(&dir)).await);
    let uri = format!("/api/records?{}", window_query(4));

    assert_eq!(send(&app, get(&uri)).await.status, StatusCode::OK);
    assert_eq!(send(&app, get(&uri)).await.status, StatusCode::OK);
    assert_eq!(store.record_queries(), 1);
}

#[tokio::test]
async fn latest_on_empty_store_is_not_found() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(InMemoryMeasurementStore::new());
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    let response = send(&app, get("/api/latest")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn latest_returns_newest_record() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(seeded_store(START, 3));
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    let response = send(&app, get("/api/latest")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["dt"], START + 2 * HALF_HOUR);
}

#[tokio::test]
async fn series_projects_requested_measures_in_order() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(seeded_store(START, 4));
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    let uri = format!("/api/series?measures=humidity,temp&{}", window_query(4));
    let response = send(&app, get(&uri)).await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    let points = json.as_array().unwrap();
    assert_eq!(points.len(), 4);
    let first = &points[0]["values"];
    assert_eq!(first.as_array().unwrap().len(), 5);
    assert_eq!(first[0], 60.0);
    assert_eq!(first[1], 10.0 + (START / HALF_HOUR) as f64);
    assert_eq!(first[2], 0.0);
}

#[tokio::test]
async fn series_rejects_bad_measure_lists() {
    let dir = temp_dir();
    let store = Arc::new(CountingStore::new(seeded_store(START, 4)));
    let app = create_api_router(build_state(store.clone(), test_config(&dir)).await);

    let response = send(&app, get("/api/series?measures=temp,dew_point")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["code"], "UNKNOWN_MEASURE");

    let response = send(
        &app,
        get("/api/series?measures=temp,temp_min,temp_max,feels_like,pressure,humidity"),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["code"], "TOO_MANY_MEASURES");

    let response = send(&app, get("/api/series")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["code"], "INVALID_INPUT");

    assert_eq!(store.projection_queries(), 0);
}

#[tokio::test]
async fn plot_returns_svg() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(seeded_store(START, 4));
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    let uri = format!("/api/plot/humidity?{}&theme=light", window_query(4));
    let response = send(&app, get(&uri)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "image/svg+xml");
    assert!(response.text().starts_with("<svg"));
}

#[tokio::test]
async fn plot_of_unknown_measure_is_rejected() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(seeded_store(START, 4));
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    let response = send(&app, get("/api/plot/dew_point")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["code"], "UNKNOWN_MEASURE");
}

#[tokio::test]
async fn chart_is_rendered_once_per_window_and_theme() {
    let dir = temp_dir();
    let store = Arc::new(CountingStore::new(seeded_store(START, 4)));
    let state = build_state(store.clone(), test_config(&dir)).await;
    let app = create_api_router(state.clone());

    let uri = format!("/api/temp?{}", window_query(4));
    let first = send(&app, get(&uri)).await;
    let second = send(&app, get(&uri)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
    assert_eq!(store.projection_queries(), 1);
    assert_eq!(state.caches.charts.len(), 1);

    // Same series, other theme: a new chart but no new projection.
    let light = send(&app, get(&format!("{}&theme=light", uri))).await;
    assert_eq!(light.status, StatusCode::OK);
    assert_ne!(light.body, first.body);
    assert_eq!(store.projection_queries(), 1);
    assert_eq!(state.caches.charts.len(), 2);

    // The chart's projection is shared with the series endpoint.
    let series = format!(
        "/api/series?measures=temp,temp_min,temp_max,feels_like&{}",
        window_query(4)
    );
    assert_eq!(send(&app, get(&series)).await.status, StatusCode::OK);
    assert_eq!(store.projection_queries(), 1);
}

#[tokio::test]
async fn pressure_chart_renders_without_data() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(InMemoryMeasurementStore::new());
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    let response = send(&app, get("/api/pressure")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("No data"));
}

#[tokio::test]
async fn meta_lists_measures_and_themes() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(seeded_store(START, 1));
    let state = build_state(store, test_config(&dir)).await;
    state.set_zone("Bologna");
    let app = create_api_router(state);

    let response = send(&app, get("/api/meta")).await;
    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["zone"], "Bologna");
    assert!(json["measures"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m == "temp"));
    assert!(json["themes"].as_array().unwrap().iter().any(|t| t == "dark"));
}

#[tokio::test]
async fn conditions_returns_catalog() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(InMemoryMeasurementStore::new());
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    let response = send(&app, get("/api/conditions")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["801"]["name"], "Clouds");
}

#[tokio::test]
async fn health_endpoints_respond() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(seeded_store(START, 1));
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    let ping = send(&app, get("/health/ping")).await;
    assert_eq!(ping.status, StatusCode::OK);
    assert_eq!(ping.json()["message"], "pong");

    let ready = send(&app, get("/health/ready")).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.json()["status"], "healthy");
    assert_eq!(ready.json()["details"]["latest_dt"], START);
}

#[tokio::test]
async fn ready_reports_failing_store() {
    let dir = temp_dir();
    let flaky = Arc::new(FlakyStore::new(seeded_store(START, 1)));
    let store: SharedStore = flaky.clone();
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    flaky.set_failing(true);
    let ready = send(&app, get("/health/ready")).await;
    assert_eq!(ready.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready.json()["status"], "unhealthy");

    let ping = send(&app, get("/health/ping")).await;
    assert_eq!(ping.status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let dir = temp_dir();
    let store: SharedStore = Arc::new(seeded_store(START, 1));
    let app = create_api_router(build_state(store, test_config(&dir)).await);

    send(&app, get("/api/latest")).await;
    let response = send(&app, get("/metrics")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("rainbbit_http_requests_total"));
}
