//! Axum HTTP surface for the cinema reservation engine.
//!
//! Thin imperative shell around [`cinema_core::ReservationCoordinator`]:
//! handlers extract and validate JSON, call the coordinator, and map
//! its `Result` into the envelope response shape via [`AppError`].
//!
//! # Example
//!
//! ```ignore
//! use cinema_web::{AppState, AppError};
//! use axum::{Router, routing::post, extract::State, Json};
//!
//! async fn create_cinema(
//!     State(state): State<AppState>,
//!     Json(request): Json<CreateCinemaRequest>,
//! ) -> Result<Json<Cinema>, AppError> {
//!     let cinema = state
//!         .coordinator
//!         .create_layout(&request.name, request.rows, request.columns, request.min_distance)
//!         .await?;
//!     Ok(Json(cinema))
//! }
//!
//! let app = Router::new()
//!     .route("/cinemas", post(create_cinema))
//!     .with_state(app_state);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::routing::{get, post};
use axum::Router;

// Re-export key types for convenience
pub use error::{AppError, Envelope};
pub use extractors::{ClientIp, CorrelationId, UserAgent};
pub use middleware::{correlation_id_layer, CorrelationIdExt, CORRELATION_ID_HEADER};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the full `/api/v1` route table plus the unprefixed `/health`
/// and `/health/ready` liveness/readiness endpoints. `/api/v1/health` is
/// kept as an internal alias of `/health/ready` for clients that only
/// reach the versioned prefix.
///
/// Callers still need to attach `correlation_id_layer()`,
/// `tower_http::trace::TraceLayer`, and a `tower_http::cors::CorsLayer`
/// themselves (the `server` binary does this), since those belong to
/// deployment concerns rather than the route table.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness_check))
        .route("/api/v1/health", get(handlers::readiness_check))
        .route("/api/v1/cinemas", post(handlers::create_cinema))
        .route("/api/v1/cinemas/:slug/seats", get(handlers::get_available_seats))
        .route("/api/v1/reservations", post(handlers::create_reservation))
        .route("/api/v1/reservations/cancel", post(handlers::cancel_reservation))
        .with_state(state)
}
