//! Shared helpers for the RAINBBIT API integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use rainbbit_api::{ApiConfig, AppState, Observation, ObservationSource};
use rainbbit_core::{IngestError, Record};
use rainbbit_storage::SharedStore;
use rainbbit_test_utils::fixtures::{condition_catalog, HALF_HOUR};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

/// First fixture timestamp. A multiple of the half-hour interval.
pub const START: i64 = 944_444 * HALF_HOUR;

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("TempDir creation should succeed")
}

/// Default configuration with the zone file inside `dir`.
pub fn test_config(dir: &TempDir) -> ApiConfig {
    ApiConfig {
        zone_path: dir.path().join("zone"),
        ..ApiConfig::default()
    }
}

pub async fn build_state(store: SharedStore, config: ApiConfig) -> AppState {
    AppState::new(store, config, condition_catalog(), String::new())
        .await
        .expect("state should build")
}

pub fn client(last_octet: u8) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, last_octet)), 40_000)
}

/// A GET request carrying the peer address the server would attach.
pub fn get_from(uri: &str, peer: SocketAddr) -> Request<Body> {
    let mut request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

pub fn get(uri: &str) -> Request<Body> {
    get_from(uri, client(1))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable")
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

/// An observation source that always returns the same outcome.
pub struct StubSource {
    outcome: Result<Observation, IngestError>,
    fetches: AtomicUsize,
}

impl StubSource {
    pub fn returning(record: Record, zone: &str) -> Self {
        Self {
            outcome: Ok(Observation {
                record,
                zone: zone.to_string(),
            }),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            outcome: Err(IngestError::BadStatus {
                source_name: "stub".to_string(),
                status: 503,
            }),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObservationSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch_current(&self) -> Result<Observation, IngestError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
