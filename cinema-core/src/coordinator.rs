//! Reservation coordinator (C4): orchestrates claim → persist →
//! compensate across the fast index and the durable store, plus the
//! cinema-lifecycle (C6) and availability-query (C5) operations that
//! share its capability-set environment.

use crate::capability::{
    AtomicClaim, AtomicRelease, CancelSeatsById, CinemaCreate, CinemaLookup, CreateReservation, FindSeats,
    ReadMembers, SeedAllSeats, SeedIndex,
};
use crate::environment::Clock;
use crate::error::{ClaimOutcome, CoordinatorError};
use crate::geometry::Heatmap;
use crate::model::{Cinema, NewCinema, NewReservation, Reservation, SeatCoord};
use cinema_runtime::{retry_with_backoff, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, RetryPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The full durable-store capability set the coordinator depends on.
pub trait DurableStore: CinemaLookup + CinemaCreate + CreateReservation + FindSeats + CancelSeatsById + SeedAllSeats {}

impl<T> DurableStore for T where
    T: CinemaLookup + CinemaCreate + CreateReservation + FindSeats + CancelSeatsById + SeedAllSeats
{
}

/// The full fast-index capability set the coordinator depends on.
pub trait FastIndex: AtomicClaim + AtomicRelease + ReadMembers + SeedIndex {}

impl<T> FastIndex for T where T: AtomicClaim + AtomicRelease + ReadMembers + SeedIndex {}

impl<E> From<CircuitBreakerError<E>> for CoordinatorError
where
    E: Into<Self>,
{
    fn from(err: CircuitBreakerError<E>) -> Self {
        match err {
            CircuitBreakerError::Open => Self::Internal("circuit breaker open".to_owned()),
            CircuitBreakerError::Inner(inner) => inner.into(),
        }
    }
}

/// Input to [`ReservationCoordinator::reserve_seats`].
#[derive(Debug, Clone)]
pub struct ReserveSeatsRequest {
    /// Slug of the cinema to reserve in.
    pub cinema_slug: String,
    /// Optional free-text note.
    pub note: Option<String>,
    /// Seats to claim, in request order. Must be non-empty.
    pub seats: Vec<SeatCoord>,
}

/// Input to [`ReservationCoordinator::cancel_seats`].
#[derive(Debug, Clone)]
pub struct CancelSeatsRequest {
    /// Slug of the cinema to cancel in.
    pub cinema_slug: String,
    /// Seats to release. Must be non-empty.
    pub seats: Vec<SeatCoord>,
}

/// Result of [`ReservationCoordinator::readiness`]: `Ok(())` per
/// dependency if reachable within the deadline, `Err(message)`
/// otherwise.
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    /// Durable store probe result.
    pub store: Result<(), String>,
    /// Fast index probe result.
    pub fast_index: Result<(), String>,
}

impl ReadinessReport {
    /// Whether every dependency responded within the deadline.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.store.is_ok() && self.fast_index.is_ok()
    }
}

fn fast_index_key(cinema_id: i64) -> String {
    format!("cinema:{cinema_id}:seats")
}

fn validate_bounds(cinema: &Cinema, seats: &[SeatCoord]) -> Result<(), CoordinatorError> {
    let in_bounds = seats
        .iter()
        .all(|s| s.row >= 0 && s.row < cinema.rows && s.column >= 0 && s.column < cinema.columns);
    if in_bounds {
        Ok(())
    } else {
        Err(CoordinatorError::InvalidSeatPosition)
    }
}

/// Orchestrates the cinema reservation engine's full operation set
/// (C4/C5/C6) over an injected fast index and durable store.
///
/// Both stores are wrapped in their own [`CircuitBreaker`] so a
/// degraded dependency fails fast rather than queuing requests.
/// Retries are never applied around `AtomicClaim` or `Create` — a
/// mid-claim ambiguity must not be silently retried — but read-only
/// operations (`ReadMembers`, `FindSeats`, availability queries) use
/// `retry_with_backoff`.
pub struct ReservationCoordinator {
    store: Arc<dyn DurableStore>,
    fast_index: Arc<dyn FastIndex>,
    clock: Arc<dyn Clock>,
    store_breaker: CircuitBreaker,
    fast_index_breaker: CircuitBreaker,
    read_retry: RetryPolicy,
}

impl ReservationCoordinator {
    /// Construct a coordinator with the default circuit-breaker
    /// configuration (`failure_threshold: 5, timeout: 60s,
    /// success_threshold: 2`) for both stores.
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>, fast_index: Arc<dyn FastIndex>, clock: Arc<dyn Clock>) -> Self {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(5)
            .timeout(Duration::from_secs(60))
            .success_threshold(2)
            .build();
        Self {
            store,
            fast_index,
            clock,
            store_breaker: CircuitBreaker::new(config.clone()),
            fast_index_breaker: CircuitBreaker::new(config),
            read_retry: RetryPolicy::default(),
        }
    }

    /// Create a new cinema layout (C6).
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Validation`] if `name` is shorter
    /// than 5 visible characters after trimming, or `rows`/`columns`
    /// is not positive. Returns [`CoordinatorError::CinemaAlreadyExists`]
    /// if the name is already taken.
    pub async fn create_layout(
        &self,
        name: &str,
        rows: i32,
        columns: i32,
        min_distance: i32,
    ) -> Result<Cinema, CoordinatorError> {
        let trimmed = name.trim();
        if trimmed.len() < 5 {
            return Err(CoordinatorError::Validation("name must be at least 5 characters".to_owned()));
        }
        if rows < 1 || columns < 1 {
            return Err(CoordinatorError::Validation("rows and columns must be positive".to_owned()));
        }
        if min_distance < 0 {
            return Err(CoordinatorError::Validation("min_distance must not be negative".to_owned()));
        }

        let slug = slug::slugify(trimmed);
        let new_cinema = NewCinema {
            name: trimmed.to_owned(),
            slug,
            rows,
            columns,
            min_distance,
        };

        self.store_breaker
            .call(|| async { self.store.create(new_cinema).await })
            .await
            .map_err(|err| match err {
                CircuitBreakerError::Open => CoordinatorError::Internal("circuit breaker open".to_owned()),
                CircuitBreakerError::Inner(store_err) => match store_err {
                    crate::error::StoreError::Conflict(_) => CoordinatorError::CinemaAlreadyExists,
                    other => other.into(),
                },
            })
    }

    async fn resolve_cinema(&self, slug: &str) -> Result<Cinema, CoordinatorError> {
        let slug = slug.to_owned();
        retry_with_backoff(self.read_retry.clone(), || {
            let slug = slug.clone();
            async move { self.store.find_by_slug(&slug).await }
        })
        .await
        .map_err(Into::into)
    }

    /// Reserve `req.seats` in `req.cinema_slug` (C4 `ReserveSeats`).
    ///
    /// # Errors
    ///
    /// See the module documentation for the full error taxonomy:
    /// [`CoordinatorError::CinemaNotFound`], `InvalidSeatPosition`,
    /// `SeatsAlreadyReserved`, `MinDistanceViolation`, or
    /// `CompensationFailed` if persisting fails *and* the fast-index
    /// rollback also fails.
    pub async fn reserve_seats(&self, req: ReserveSeatsRequest) -> Result<Reservation, CoordinatorError> {
        if req.seats.is_empty() {
            return Err(CoordinatorError::Validation("seats must not be empty".to_owned()));
        }

        cinema_runtime::metrics::CoordinatorMetrics::record_attempt();

        let cinema = self.resolve_cinema(&req.cinema_slug).await?;
        validate_bounds(&cinema, &req.seats)?;

        let cinema_key = fast_index_key(cinema.id);
        let claim_outcome = self
            .fast_index_breaker
            .call(|| async { self.fast_index.claim(&cinema_key, cinema.min_distance, &req.seats).await })
            .await?;

        match claim_outcome {
            ClaimOutcome::Conflict(seats) => return Err(CoordinatorError::SeatsAlreadyReserved(seats)),
            ClaimOutcome::DistanceViolation(seats) => return Err(CoordinatorError::MinDistanceViolation(seats)),
            ClaimOutcome::Claimed => {}
        }

        let new_reservation = NewReservation {
            cinema_id: cinema.id,
            note: req.note,
            seats: req.seats.clone(),
        };

        let persist_result = self.store_breaker.call(|| async { self.store.create(new_reservation).await }).await;

        match persist_result {
            Ok(reservation) => Ok(reservation),
            Err(persist_err) => {
                let original_error = match &persist_err {
                    CircuitBreakerError::Open => "circuit breaker open".to_owned(),
                    CircuitBreakerError::Inner(e) => e.to_string(),
                };

                let release_result =
                    self.fast_index_breaker.call(|| async { self.fast_index.release(&cinema_key, &req.seats).await }).await;

                if let Err(release_err) = release_result {
                    let rollback_error = release_err.to_string();
                    cinema_runtime::metrics::CoordinatorMetrics::record_compensation_failure();
                    tracing::error!(
                        cinema_id = cinema.id,
                        seats = ?req.seats,
                        original_error = %original_error,
                        rollback_error = %rollback_error,
                        "CRITICAL: durable persist failed and fast-index compensation also failed"
                    );
                    return Err(CoordinatorError::CompensationFailed {
                        original_error,
                        rollback_error,
                    });
                }

                cinema_runtime::metrics::CoordinatorMetrics::record_compensation();
                Err(persist_err.into())
            }
        }
    }

    /// Cancel `req.seats` in `req.cinema_slug` (C4 `CancelSeats`).
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::SeatsNotReserved`] if any requested
    /// coordinate has no live reservation.
    pub async fn cancel_seats(&self, req: CancelSeatsRequest) -> Result<(), CoordinatorError> {
        if req.seats.is_empty() {
            return Err(CoordinatorError::Validation("seats must not be empty".to_owned()));
        }

        let cinema = self.resolve_cinema(&req.cinema_slug).await?;
        validate_bounds(&cinema, &req.seats)?;

        let found = retry_with_backoff(self.read_retry.clone(), || async {
            self.store.find_reserved(cinema.id, &req.seats).await
        })
        .await?;

        if found.len() != req.seats.len() {
            return Err(CoordinatorError::SeatsNotReserved);
        }

        let seat_ids: Vec<i64> = found.iter().map(|s| s.id).collect();
        self.store_breaker.call(|| async { self.store.cancel(&seat_ids).await }).await?;

        let cinema_key = fast_index_key(cinema.id);
        if let Err(release_err) =
            self.fast_index_breaker.call(|| async { self.fast_index.release(&cinema_key, &req.seats).await }).await
        {
            tracing::error!(
                cinema_id = cinema.id,
                seats = ?req.seats,
                error = %release_err,
                "CRITICAL: durable cancel succeeded but fast-index release failed"
            );
        }

        Ok(())
    }

    /// Compute every safe group of `group_size` consecutive seats in
    /// `cinema_slug` (C5 `GetAvailableSeats`).
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::CinemaNotFound`] if the slug does
    /// not resolve.
    pub async fn get_available_seats(
        &self,
        cinema_slug: &str,
        group_size: i32,
    ) -> Result<Vec<Vec<SeatCoord>>, CoordinatorError> {
        let cinema = self.resolve_cinema(cinema_slug).await?;
        let heatmap = self.build_heatmap(&cinema).await?;
        Ok(heatmap.safe_blocks(group_size))
    }

    /// Return the subset of `coords` that is available in
    /// `cinema_slug` (C5 `CheckAvailableSeats`).
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::CinemaNotFound`] if the slug does
    /// not resolve.
    pub async fn check_available_seats(
        &self,
        cinema_slug: &str,
        coords: &[SeatCoord],
    ) -> Result<Vec<SeatCoord>, CoordinatorError> {
        let cinema = self.resolve_cinema(cinema_slug).await?;
        let heatmap = self.build_heatmap(&cinema).await?;
        Ok(heatmap.filter_available(coords))
    }

    async fn build_heatmap(&self, cinema: &Cinema) -> Result<Heatmap, CoordinatorError> {
        let cinema_key = fast_index_key(cinema.id);
        let members =
            retry_with_backoff(self.read_retry.clone(), || async { self.fast_index.members(&cinema_key).await })
                .await?;
        Heatmap::build(cinema.rows, cinema.columns, cinema.min_distance, &members)
            .map_err(|e| CoordinatorError::Internal(e.to_string()))
    }

    /// Probe both stores with a bounded deadline (C8/ambient readiness).
    ///
    /// Uses cheap existing capabilities (`SeedAllSeats`, `ReadMembers`
    /// against a key no real cinema will ever use) rather than a
    /// dedicated ping trait, since every adapter already implements
    /// both.
    pub async fn readiness(&self, deadline: Duration) -> ReadinessReport {
        let store_check = match tokio::time::timeout(deadline, self.store.all_reserved_seats()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err("timed out".to_owned()),
        };

        let fast_index_check = match tokio::time::timeout(deadline, self.fast_index.members("__readiness_probe__")).await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err("timed out".to_owned()),
        };

        ReadinessReport {
            store: store_check,
            fast_index: fast_index_check,
        }
    }

    /// Re-seed the fast index from the durable store. Runs at startup
    /// before the HTTP listener binds; seeding failures are fatal.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Internal`] if either store cannot
    /// be reached.
    pub async fn seed_fast_index(&self) -> Result<(), CoordinatorError> {
        let all_seats = self.store.all_reserved_seats().await?;

        let mut by_cinema: HashMap<i64, Vec<SeatCoord>> = HashMap::new();
        for seat in all_seats {
            by_cinema.entry(seat.cinema_id).or_default().push(seat.coord());
        }

        let cinema_count = by_cinema.len();
        for (cinema_id, seats) in by_cinema {
            let cinema_key = fast_index_key(cinema_id);
            self.fast_index.seed(&cinema_key, &seats).await?;
        }

        tracing::info!(seeded_at = %self.clock.now(), cinemas = cinema_count, "fast index seeded from durable store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::SystemClock;
    use cinema_testing::mocks::{InMemoryFastIndex, InMemoryStore};

    fn coordinator() -> ReservationCoordinator {
        ReservationCoordinator::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryFastIndex::new()), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn create_layout_rejects_short_name() {
        let coordinator = coordinator();
        let result = coordinator.create_layout("abcd", 10, 10, 1).await;
        assert!(matches!(result, Err(CoordinatorError::Validation(_))));
    }

    #[tokio::test]
    async fn create_layout_derives_slug() {
        let coordinator = coordinator();
        let cinema = coordinator.create_layout("Grand Cinema Downtown", 10, 15, 2).await.unwrap();
        assert_eq!(cinema.slug, "grand-cinema-downtown");
    }

    #[tokio::test]
    async fn reserve_then_reserve_again_conflicts() {
        let coordinator = coordinator();
        let cinema = coordinator.create_layout("Grand Cinema Downtown", 10, 15, 0).await.unwrap();

        coordinator
            .reserve_seats(ReserveSeatsRequest {
                cinema_slug: cinema.slug.clone(),
                note: None,
                seats: vec![SeatCoord::new(0, 0)],
            })
            .await
            .unwrap();

        let result = coordinator
            .reserve_seats(ReserveSeatsRequest {
                cinema_slug: cinema.slug,
                note: None,
                seats: vec![SeatCoord::new(0, 0)],
            })
            .await;
        assert!(matches!(result, Err(CoordinatorError::SeatsAlreadyReserved(_))));
    }

    #[tokio::test]
    async fn reserve_out_of_bounds_rejected() {
        let coordinator = coordinator();
        let cinema = coordinator.create_layout("Grand Cinema Downtown", 2, 2, 0).await.unwrap();

        let result = coordinator
            .reserve_seats(ReserveSeatsRequest {
                cinema_slug: cinema.slug,
                note: None,
                seats: vec![SeatCoord::new(5, 5)],
            })
            .await;
        assert!(matches!(result, Err(CoordinatorError::InvalidSeatPosition)));
    }

    #[tokio::test]
    async fn reserve_then_cancel_then_reserve_again_succeeds() {
        let coordinator = coordinator();
        let cinema = coordinator.create_layout("Grand Cinema Downtown", 10, 15, 0).await.unwrap();

        coordinator
            .reserve_seats(ReserveSeatsRequest {
                cinema_slug: cinema.slug.clone(),
                note: None,
                seats: vec![SeatCoord::new(5, 5)],
            })
            .await
            .unwrap();

        coordinator
            .cancel_seats(CancelSeatsRequest {
                cinema_slug: cinema.slug.clone(),
                seats: vec![SeatCoord::new(5, 5)],
            })
            .await
            .unwrap();

        coordinator
            .reserve_seats(ReserveSeatsRequest {
                cinema_slug: cinema.slug,
                note: None,
                seats: vec![SeatCoord::new(5, 5)],
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_unreserved_seat_fails() {
        let coordinator = coordinator();
        let cinema = coordinator.create_layout("Grand Cinema Downtown", 10, 15, 0).await.unwrap();

        let result = coordinator
            .cancel_seats(CancelSeatsRequest {
                cinema_slug: cinema.slug,
                seats: vec![SeatCoord::new(1, 1)],
            })
            .await;
        assert!(matches!(result, Err(CoordinatorError::SeatsNotReserved)));
    }

    #[tokio::test]
    async fn get_available_seats_excludes_reserved() {
        let coordinator = coordinator();
        let cinema = coordinator.create_layout("Grand Cinema Downtown", 2, 4, 0).await.unwrap();

        coordinator
            .reserve_seats(ReserveSeatsRequest {
                cinema_slug: cinema.slug.clone(),
                note: None,
                seats: vec![SeatCoord::new(0, 0)],
            })
            .await
            .unwrap();

        let blocks = coordinator.get_available_seats(&cinema.slug, 2).await.unwrap();
        assert!(blocks.iter().all(|block| !block.contains(&SeatCoord::new(0, 0))));
    }

    #[tokio::test]
    async fn seed_fast_index_restores_membership() {
        let store = Arc::new(InMemoryStore::new());
        let fast_index = Arc::new(InMemoryFastIndex::new());
        let coordinator = ReservationCoordinator::new(store.clone(), fast_index.clone(), Arc::new(SystemClock));

        let cinema = coordinator.create_layout("Grand Cinema Downtown", 10, 15, 0).await.unwrap();
        coordinator
            .reserve_seats(ReserveSeatsRequest {
                cinema_slug: cinema.slug.clone(),
                note: None,
                seats: vec![SeatCoord::new(3, 3)],
            })
            .await
            .unwrap();

        // Simulate the fast index losing state, then re-seed from the
        // durable store.
        let fresh_index = Arc::new(InMemoryFastIndex::new());
        let coordinator = ReservationCoordinator::new(store, fresh_index, Arc::new(SystemClock));
        coordinator.seed_fast_index().await.unwrap();

        let result = coordinator
            .reserve_seats(ReserveSeatsRequest {
                cinema_slug: cinema.slug,
                note: None,
                seats: vec![SeatCoord::new(3, 3)],
            })
            .await;
        assert!(matches!(result, Err(CoordinatorError::SeatsAlreadyReserved(_))));
    }
}
