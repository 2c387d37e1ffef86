//! Availability query endpoint (C5).

use crate::error::{AppError, Envelope};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use cinema_core::SeatCoord;
use serde::Deserialize;

/// Query parameters for `GET /api/v1/cinemas/:slug/seats`.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Size of each contiguous group to search for. Defaults to `1`,
    /// which reports every individually available seat.
    pub number_of_seats: Option<i32>,
}

/// Report every safe contiguous seat grouping of the requested size.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/cinemas/:slug/seats?number_of_seats=N
/// ```
///
/// # Errors
///
/// Returns `CINEMA_NOT_FOUND` (404) if the slug does not resolve.
pub async fn get_available_seats(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Envelope<Vec<Vec<SeatCoord>>>>, AppError> {
    let group_size = query.number_of_seats.unwrap_or(1);
    let blocks = state.coordinator.get_available_seats(&slug, group_size).await?;
    Ok(Json(Envelope::ok("available seat groupings", blocks)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::cinemas::{create_cinema, CreateCinemaRequest};
    use axum::extract::State as AxumState;
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

    #[tokio::test]
    async fn unknown_cinema_returns_not_found() {
        let result = get_available_seats(
            AxumState(state()),
            Path("nope".to_owned()),
            Query(AvailabilityQuery { number_of_seats: None }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn defaults_to_single_seat_groupings() {
        let state = state();
        create_cinema(
            AxumState(state.clone()),
            Json(CreateCinemaRequest {
                name: "Grand Cinema Downtown".to_owned(),
                rows: 2,
                columns: 2,
                min_distance: 0,
            }),
        )
        .await
        .unwrap();

        let Json(body) = get_available_seats(
            AxumState(state),
            Path("grand-cinema-downtown".to_owned()),
            Query(AvailabilityQuery { number_of_seats: None }),
        )
        .await
        .unwrap();

        assert_eq!(body.data.unwrap().len(), 4);
    }
}
