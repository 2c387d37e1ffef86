//! End-to-end HTTP tests against the full route table, using in-memory
//! stores so no external services are required.

use axum_test::TestServer;
use cinema_core::environment::SystemClock;
use cinema_core::ReservationCoordinator;
use cinema_testing::mocks::{InMemoryFastIndex, InMemoryStore};
use cinema_web::{router, AppState};
use serde_json::json;
use std::sync::Arc;

fn test_server() -> TestServer {
    let coordinator = Arc::new(ReservationCoordinator::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryFastIndex::new()),
        Arc::new(SystemClock),
    ));
    TestServer::new(router(AppState::new(coordinator))).unwrap()
}

#[tokio::test]
async fn health_check_is_ok() {
    let server = test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn readiness_check_is_ok_with_in_memory_stores() {
    let server = test_server();
    let response = server.get("/health/ready").await;
    response.assert_status_ok();
    response.assert_json_contains(&json!({ "ready": true }));
}

#[tokio::test]
async fn api_v1_health_aliases_readiness_check() {
    let server = test_server();
    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    response.assert_json_contains(&json!({ "ready": true }));
}

#[tokio::test]
async fn full_reservation_lifecycle_over_http() {
    let server = test_server();

    let create = server
        .post("/api/v1/cinemas")
        .json(&json!({
            "name": "Grand Cinema Downtown",
            "rows": 5,
            "columns": 5,
            "min_distance": 0,
        }))
        .await;
    create.assert_status(axum::http::StatusCode::CREATED);

    let reserve = server
        .post("/api/v1/reservations")
        .json(&json!({
            "cinema_slug": "grand-cinema-downtown",
            "note": "date night",
            "seats": [{ "row": 1, "col": 1 }],
        }))
        .await;
    reserve.assert_status(axum::http::StatusCode::CREATED);

    let seats = server.get("/api/v1/cinemas/grand-cinema-downtown/seats").await;
    seats.assert_status_ok();
    let body: serde_json::Value = seats.json();
    let groupings = body["data"].as_array().unwrap();
    assert!(groupings.iter().all(|group| group != &json!([{ "row": 1, "column": 1 }])));

    let cancel = server
        .post("/api/v1/reservations/cancel")
        .json(&json!({
            "cinema_slug": "grand-cinema-downtown",
            "seats": [{ "row": 1, "col": 1 }],
        }))
        .await;
    cancel.assert_status_ok();
}

#[tokio::test]
async fn unknown_cinema_returns_404() {
    let server = test_server();
    let response = server.get("/api/v1/cinemas/does-not-exist/seats").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}
