//! Admission control through the full router.

mod support;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use proptest::prelude::*;
use rainbbit_api::{create_api_router, ApiConfig};
use rainbbit_storage::SharedStore;
use rainbbit_test_utils::fixtures::seeded_store;
use std::net::IpAddr;
use std::sync::Arc;
use support::*;
use tempfile::TempDir;

fn throttled_config(dir: &TempDir, global_burst: u32, client_burst: u32) -> ApiConfig {
    ApiConfig {
        global_rate_per_sec: 1,
        global_burst,
        client_rate_per_sec: 1,
        client_burst,
        ..test_config(dir)
    }
}

fn store() -> SharedStore {
    Arc::new(seeded_store(START, 2))
}

#[tokio::test]
async fn client_over_budget_gets_429_with_retry_after() {
    let dir = temp_dir();
    let app = create_api_router(build_state(store(), throttled_config(&dir, 100, 2)).await);

    assert_eq!(send(&app, get("/api/latest")).await.status, StatusCode::OK);
    assert_eq!(send(&app, get("/api/latest")).await.status, StatusCode::OK);

    let rejected = send(&app, get("/api/latest")).await;
    assert_eq!(rejected.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected.json()["code"], "TOO_MANY_REQUESTS");
    let retry_after: u64 = rejected.headers[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);

    // Another client still has its own budget.
    let other = send(&app, get_from("/api/latest", client(2))).await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn exhausted_global_budget_gets_503() {
    let dir = temp_dir();
    let app = create_api_router(build_state(store(), throttled_config(&dir, 2, 30)).await);

    assert_eq!(send(&app, get_from("/api/meta", client(1))).await.status, StatusCode::OK);
    assert_eq!(send(&app, get_from("/api/meta", client(2))).await.status, StatusCode::OK);

    let rejected = send(&app, get_from("/api/meta", client(3))).await;
    assert_eq!(rejected.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(rejected.json()["code"], "SERVICE_BUSY");
    assert!(rejected.headers.contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn unknown_client_address_is_an_internal_error() {
    let dir = temp_dir();
    let app = create_api_router(build_state(store(), test_config(&dir)).await);

    let request = Request::builder()
        .uri("/api/latest")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn forwarded_address_is_used_when_trusted() {
    let dir = temp_dir();
    let config = ApiConfig {
        trust_forwarded_headers: true,
        ..test_config(&dir)
    };
    let state = build_state(store(), config).await;
    let app = create_api_router(state.clone());

    let request = Request::builder()
        .uri("/api/latest")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::OK);

    let forwarded: IpAddr = "203.0.113.7".parse().unwrap();
    assert!(state.admission.is_tracked(&forwarded));
    assert_eq!(state.admission.client_count(), 1);
}

#[tokio::test]
async fn forwarded_address_is_ignored_when_untrusted() {
    let dir = temp_dir();
    let state = build_state(store(), test_config(&dir)).await;
    let app = create_api_router(state.clone());

    let mut request = get("/api/latest");
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
    assert_eq!(send(&app, request).await.status, StatusCode::OK);

    let forwarded: IpAddr = "203.0.113.7".parse().unwrap();
    assert!(!state.admission.is_tracked(&forwarded));
    assert!(state.admission.is_tracked(&client(1).ip()));
}

#[tokio::test]
async fn disabled_rate_limiting_admits_everything() {
    let dir = temp_dir();
    let config = ApiConfig {
        rate_limit_enabled: false,
        ..throttled_config(&dir, 1, 1)
    };
    let state = build_state(store(), config).await;
    let app = create_api_router(state.clone());

    for _ in 0..5 {
        assert_eq!(send(&app, get("/api/meta")).await.status, StatusCode::OK);
    }
    assert_eq!(state.admission.client_count(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Within one burst window exactly `burst` requests from a client pass.
    #[test]
    fn prop_client_admitted_exactly_burst_times(burst in 1u32..8, extra in 1usize..4) {
        let dir = temp_dir();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (ok, throttled) = runtime.block_on(async {
            let config = throttled_config(&dir, 1_000, burst);
            let app = create_api_router(build_state(store(), config).await);
            let mut ok = 0;
            let mut throttled = 0;
            for _ in 0..(burst as usize + extra) {
                match send(&app, get("/health/ping")).await.status {
                    StatusCode::OK => ok += 1,
                    StatusCode::TOO_MANY_REQUESTS => throttled += 1,
                    other => panic!("unexpected status {}", other),
                }
            }
            (ok, throttled)
        });
        prop_assert_eq!(ok, burst as usize);
        prop_assert_eq!(throttled, extra);
    }
}
