//! Reservation endpoints (C4: `ReserveSeats`, `CancelSeats`).

use crate::error::{AppError, Envelope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cinema_core::{CancelSeatsRequest, Reservation, ReserveSeatsRequest, SeatCoord};
use serde::{Deserialize, Serialize};

/// Wire representation of a seat coordinate: `{row, col}`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SeatInput {
    /// Row, `[0, rows)`.
    pub row: i32,
    /// Column, `[0, columns)`.
    pub col: i32,
}

impl From<SeatInput> for SeatCoord {
    fn from(input: SeatInput) -> Self {
        Self::new(input.row, input.col)
    }
}

/// Body of `POST /api/v1/reservations`.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    /// Cinema to reserve in.
    pub cinema_slug: String,
    /// Optional free-text note.
    pub note: Option<String>,
    /// Seats to claim, non-empty.
    pub seats: Vec<SeatInput>,
}

/// Reserve a group of seats.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/reservations
/// ```
///
/// # Errors
///
/// Returns `VALIDATION_ERROR` (400) on an empty seat list,
/// `INVALID_SEAT_POSITION` (400) on out-of-bounds coordinates,
/// `SEATS_RESERVED` (409) or `MIN_DISTANCE_VIOLATION` (400) on
/// contention, and `CINEMA_NOT_FOUND` (404) for an unknown slug.
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Envelope<Reservation>>), AppError> {
    let reservation = state
        .coordinator
        .reserve_seats(ReserveSeatsRequest {
            cinema_slug: request.cinema_slug,
            note: request.note,
            seats: request.seats.into_iter().map(Into::into).collect(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(Envelope::ok("seats reserved", reservation))))
}

/// Body of `POST /api/v1/reservations/cancel`.
#[derive(Debug, Deserialize)]
pub struct CancelReservationRequest {
    /// Cinema to cancel in.
    pub cinema_slug: String,
    /// Seats to release, non-empty.
    pub seats: Vec<SeatInput>,
}

/// Cancel a previously reserved group of seats.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/reservations/cancel
/// ```
///
/// # Errors
///
/// Returns `SEATS_NOT_AVAILABLE` (409) if any requested seat has no
/// live reservation, or `CINEMA_NOT_FOUND` (404) for an unknown slug.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Json(request): Json<CancelReservationRequest>,
) -> Result<Json<Envelope<()>>, AppError> {
    state
        .coordinator
        .cancel_seats(CancelSeatsRequest {
            cinema_slug: request.cinema_slug,
            seats: request.seats.into_iter().map(Into::into).collect(),
        })
        .await?;

    Ok(Json(Envelope::ok("seats canceled", ())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::cinemas::{create_cinema, CreateCinemaRequest};
    use cinema_core::environment::SystemClock;
    use cinema_core::ReservationCoordinator;
    use cinema_testing::mocks::{InMemoryFastIndex, InMemoryStore};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(ReservationCoordinator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryFastIndex::new()),
            Arc::new(SystemClock),
        )))
    }

    async fn seed_grand_cinema(state: &AppState) {
        create_cinema(
            State(state.clone()),
            Json(CreateCinemaRequest {
                name: "Grand Cinema Downtown".to_owned(),
                rows: 10,
                columns: 15,
                min_distance: 0,
            }),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn reserve_then_cancel_round_trips() {
        let state = state();
        seed_grand_cinema(&state).await;

        let (status, Json(reserved)) = create_reservation(
            State(state.clone()),
            Json(CreateReservationRequest {
                cinema_slug: "grand-cinema-downtown".to_owned(),
                note: Some("birthday".to_owned()),
                seats: vec![SeatInput { row: 0, col: 0 }],
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reserved.data.unwrap().seats.len(), 1);

        let Json(canceled) = cancel_reservation(
            State(state),
            Json(CancelReservationRequest {
                cinema_slug: "grand-cinema-downtown".to_owned(),
                seats: vec![SeatInput { row: 0, col: 0 }],
            }),
        )
        .await
        .unwrap();
        assert!(canceled.success);
    }

    #[tokio::test]
    async fn reserve_empty_seats_rejected() {
        let state = state();
        seed_grand_cinema(&state).await;

        let result = create_reservation(
            State(state),
            Json(CreateReservationRequest {
                cinema_slug: "grand-cinema-downtown".to_owned(),
                note: None,
                seats: vec![],
            }),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cancel_unreserved_seat_rejected() {
        let state = state();
        seed_grand_cinema(&state).await;

        let result = cancel_reservation(
            State(state),
            Json(CancelReservationRequest {
                cinema_slug: "grand-cinema-downtown".to_owned(),
                seats: vec![SeatInput { row: 1, col: 1 }],
            }),
        )
        .await;

        assert!(result.is_err());
    }
}
