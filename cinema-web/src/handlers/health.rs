//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::time::Duration;

/// Simple health check endpoint (liveness).
///
/// Returns 200 OK whenever the process is up; does not touch the
/// durable store or the fast index.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness response body.
#[derive(Debug, Serialize)]
pub struct ReadinessBody {
    /// Whether both the fast index and the durable store are reachable.
    pub ready: bool,
    /// Durable store probe result, `"ok"` or the failure message.
    pub store: String,
    /// Fast index probe result, `"ok"` or the failure message.
    pub fast_index: String,
}

/// Readiness check: pings both the durable store and the fast index
/// with a 5-second bounded deadline.
///
/// # Endpoint
///
/// ```text
/// GET /health/ready
/// ```
///
/// # Status codes
///
/// - 200 OK: both dependencies reachable.
/// - 503 Service Unavailable: either dependency failed or timed out.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessBody>) {
    let report = state.coordinator.readiness(Duration::from_secs(5)).await;
    let status = if report.is_ready() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(ReadinessBody {
            ready: report.is_ready(),
            store: report.store.map_or_else(|e| e, |()| "ok".to_owned()),
            fast_index: report.fast_index.map_or_else(|e| e, |()| "ok".to_owned()),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinema_core::environment::SystemClock;
    use cinema_core::ReservationCoordinator;
    use cinema_testing::mocks::{InMemoryFastIndex, InMemoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn simple_health_check_ok() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn readiness_check_ok_when_stores_respond() {
        let coordinator = Arc::new(ReservationCoordinator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryFastIndex::new()),
            Arc::new(SystemClock),
        ));
        let state = AppState::new(coordinator);

        let (status, Json(body)) = readiness_check(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.ready);
    }
}
