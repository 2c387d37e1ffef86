//! Cinema lifecycle endpoint (C6).

use crate::error::{AppError, Envelope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cinema_core::Cinema;
use serde::Deserialize;

/// Body of `POST /api/v1/cinemas`.
#[derive(Debug, Deserialize)]
pub struct CreateCinemaRequest {
    /// Display name, trimmed to ≥5 visible characters.
    pub name: String,
    /// Number of rows, ≥1.
    pub rows: i32,
    /// Number of columns, ≥1.
    pub columns: i32,
    /// Minimum Manhattan distance between reserved seats, ≥0.
    pub min_distance: i32,
}

/// Create a new cinema layout.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/cinemas
/// ```
///
/// # Errors
///
/// Returns `VALIDATION_ERROR` (400) if `name`/`rows`/`columns`/
/// `min_distance` fail validation, or `CINEMA_EXISTS` (409) if the
/// name is already taken.
pub async fn create_cinema(
    State(state): State<AppState>,
    Json(request): Json<CreateCinemaRequest>,
) -> Result<(StatusCode, Json<Envelope<Cinema>>), AppError> {
    let cinema = state
        .coordinator
        .create_layout(&request.name, request.rows, request.columns, request.min_distance)
        .await?;

    Ok((StatusCode::CREATED, Json(Envelope::ok("cinema created", cinema))))
}
