//! # Cinema Testing
//!
//! In-memory test doubles for every capability trait in `cinema-core`,
//! used by the coordinator's unit tests and by downstream crates that
//! want to exercise the reservation flow without a real Postgres or
//! Redis instance.
//!
//! ## Example
//!
//! ```
//! use cinema_testing::mocks::{FixedClock, InMemoryStore};
//! use chrono::Utc;
//!
//! let clock = FixedClock::new(Utc::now());
//! let store = InMemoryStore::new();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// In-memory fakes of the domain capability traits.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use cinema_core::{
        AtomicClaim, AtomicRelease, CancelSeatsById, Cinema, CinemaCreate, CinemaLookup, ClaimOutcome, Clock,
        CreateReservation, FastIndexError, FindSeats, NewCinema, NewReservation, ReadMembers, Reservation,
        ReservedSeat, SeatCoord, SeedAllSeats, SeedIndex, StoreError,
    };
    use std::collections::{HashMap, HashSet};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Fixed clock for deterministic tests.
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use cinema_testing::mocks::FixedClock;
    /// use cinema_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2);
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock at the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    #[derive(Debug, Default)]
    struct Inner {
        cinemas: HashMap<i64, Cinema>,
        reservations: HashMap<i64, Reservation>,
        seats: HashMap<i64, ReservedSeat>,
        next_cinema_id: i64,
        next_reservation_id: i64,
        next_seat_id: i64,
    }

    /// In-memory durable store, implementing the whole C3 capability
    /// set used by the coordinator: `CinemaLookup`, `CinemaCreate`,
    /// `CreateReservation`, `FindSeats`, `CancelSeatsById`,
    /// `SeedAllSeats`.
    ///
    /// Backed by a single `tokio::sync::Mutex<Inner>` rather than one
    /// lock per table: the production adapter's unit of atomicity is a
    /// transaction across all three tables, so this double mirrors
    /// that by locking everything together.
    #[derive(Debug, Default)]
    pub struct InMemoryStore {
        inner: Mutex<Inner>,
    }

    impl InMemoryStore {
        /// Construct an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a cinema directly, bypassing `CinemaCreate::create`, for
        /// tests that want to start from an existing layout.
        pub async fn seed_cinema(&self, cinema: Cinema) {
            let mut inner = self.inner.lock().await;
            inner.next_cinema_id = inner.next_cinema_id.max(cinema.id + 1);
            inner.cinemas.insert(cinema.id, cinema);
        }
    }

    impl CinemaLookup for InMemoryStore {
        fn find_by_slug(&self, slug: &str) -> Pin<Box<dyn Future<Output = Result<Cinema, StoreError>> + Send + '_>> {
            let slug = slug.to_owned();
            Box::pin(async move {
                let inner = self.inner.lock().await;
                inner
                    .cinemas
                    .values()
                    .find(|c| c.slug == slug)
                    .cloned()
                    .ok_or(StoreError::NotFound)
            })
        }
    }

    impl CinemaCreate for InMemoryStore {
        fn create(&self, cinema: NewCinema) -> Pin<Box<dyn Future<Output = Result<Cinema, StoreError>> + Send + '_>> {
            Box::pin(async move {
                let mut inner = self.inner.lock().await;
                if inner.cinemas.values().any(|c| c.name == cinema.name || c.slug == cinema.slug) {
                    return Err(StoreError::Conflict(format!("cinema '{}' already exists", cinema.name)));
                }
                let id = inner.next_cinema_id;
                inner.next_cinema_id += 1;
                let now = Utc::now();
                let stored = Cinema {
                    id,
                    name: cinema.name,
                    slug: cinema.slug,
                    rows: cinema.rows,
                    columns: cinema.columns,
                    min_distance: cinema.min_distance,
                    created_at: now,
                    updated_at: now,
                };
                inner.cinemas.insert(id, stored.clone());
                Ok(stored)
            })
        }
    }

    impl CreateReservation for InMemoryStore {
        fn create(
            &self,
            reservation: NewReservation,
        ) -> Pin<Box<dyn Future<Output = Result<Reservation, StoreError>> + Send + '_>> {
            Box::pin(async move {
                let mut inner = self.inner.lock().await;

                let conflict = inner.seats.values().any(|seat| {
                    seat.cinema_id == reservation.cinema_id
                        && reservation.seats.iter().any(|s| s.row == seat.row && s.column == seat.column)
                });
                if conflict {
                    return Err(StoreError::Conflict("seat already has a live row".to_owned()));
                }

                let reservation_id = inner.next_reservation_id;
                inner.next_reservation_id += 1;

                let mut stored_seats = Vec::with_capacity(reservation.seats.len());
                for coord in &reservation.seats {
                    let seat_id = inner.next_seat_id;
                    inner.next_seat_id += 1;
                    let stored = ReservedSeat {
                        id: seat_id,
                        cinema_id: reservation.cinema_id,
                        reservation_id,
                        row: coord.row,
                        column: coord.column,
                    };
                    inner.seats.insert(seat_id, stored);
                    stored_seats.push(stored);
                }

                let stored_reservation = Reservation {
                    id: reservation_id,
                    cinema_id: reservation.cinema_id,
                    note: reservation.note,
                    reserved_at: Utc::now(),
                    seats: stored_seats,
                };
                inner.reservations.insert(reservation_id, stored_reservation.clone());
                Ok(stored_reservation)
            })
        }
    }

    impl FindSeats for InMemoryStore {
        fn find_reserved(
            &self,
            cinema_id: i64,
            coords: &[SeatCoord],
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ReservedSeat>, StoreError>> + Send + '_>> {
            let coords: Vec<SeatCoord> = coords.to_vec();
            Box::pin(async move {
                let inner = self.inner.lock().await;
                let wanted: HashSet<SeatCoord> = coords.into_iter().collect();
                Ok(inner
                    .seats
                    .values()
                    .filter(|seat| seat.cinema_id == cinema_id && wanted.contains(&seat.coord()))
                    .copied()
                    .collect())
            })
        }
    }

    impl CancelSeatsById for InMemoryStore {
        fn cancel(&self, seat_ids: &[i64]) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
            let seat_ids: Vec<i64> = seat_ids.to_vec();
            Box::pin(async move {
                let mut inner = self.inner.lock().await;
                for id in seat_ids {
                    inner.seats.remove(&id);
                }
                Ok(())
            })
        }
    }

    impl SeedAllSeats for InMemoryStore {
        fn all_reserved_seats(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ReservedSeat>, StoreError>> + Send + '_>> {
            Box::pin(async move {
                let inner = self.inner.lock().await;
                Ok(inner.seats.values().copied().collect())
            })
        }
    }

    /// In-memory fast index, implementing `AtomicClaim`, `AtomicRelease`,
    /// `ReadMembers`, `SeedIndex`.
    ///
    /// Uses one `Mutex<HashMap<String, HashSet<SeatCoord>>>` keyed by
    /// cinema key; the mutex is the stand-in for the production
    /// adapter's single-key Lua-script serialization.
    #[derive(Debug, Default)]
    pub struct InMemoryFastIndex {
        sets: Mutex<HashMap<String, HashSet<SeatCoord>>>,
    }

    impl InMemoryFastIndex {
        /// Construct an empty fast index.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl AtomicClaim for InMemoryFastIndex {
        fn claim(
            &self,
            cinema_key: &str,
            min_distance: i32,
            seats: &[SeatCoord],
        ) -> Pin<Box<dyn Future<Output = Result<ClaimOutcome, FastIndexError>> + Send + '_>> {
            let cinema_key = cinema_key.to_owned();
            let seats: Vec<SeatCoord> = seats.to_vec();
            Box::pin(async move {
                let mut sets = self.sets.lock().await;
                let members = sets.entry(cinema_key).or_default();

                let conflicts: Vec<SeatCoord> = seats.iter().copied().filter(|s| members.contains(s)).collect();
                if !conflicts.is_empty() {
                    return Ok(ClaimOutcome::Conflict(conflicts));
                }

                let existing: Vec<SeatCoord> = members.iter().copied().collect();
                if cinema_core::geometry::violates_min_distance(&existing, &seats, min_distance) {
                    return Ok(ClaimOutcome::DistanceViolation(seats));
                }

                members.extend(seats);
                Ok(ClaimOutcome::Claimed)
            })
        }
    }

    impl AtomicRelease for InMemoryFastIndex {
        fn release(
            &self,
            cinema_key: &str,
            seats: &[SeatCoord],
        ) -> Pin<Box<dyn Future<Output = Result<(), FastIndexError>> + Send + '_>> {
            let cinema_key = cinema_key.to_owned();
            let seats: Vec<SeatCoord> = seats.to_vec();
            Box::pin(async move {
                let mut sets = self.sets.lock().await;
                if let Some(members) = sets.get_mut(&cinema_key) {
                    for seat in seats {
                        members.remove(&seat);
                    }
                }
                Ok(())
            })
        }
    }

    impl ReadMembers for InMemoryFastIndex {
        fn members(
            &self,
            cinema_key: &str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<SeatCoord>, FastIndexError>> + Send + '_>> {
            let cinema_key = cinema_key.to_owned();
            Box::pin(async move {
                let sets = self.sets.lock().await;
                Ok(sets.get(&cinema_key).map(|m| m.iter().copied().collect()).unwrap_or_default())
            })
        }
    }

    impl SeedIndex for InMemoryFastIndex {
        fn seed(
            &self,
            cinema_key: &str,
            seats: &[SeatCoord],
        ) -> Pin<Box<dyn Future<Output = Result<(), FastIndexError>> + Send + '_>> {
            let cinema_key = cinema_key.to_owned();
            let seats: HashSet<SeatCoord> = seats.iter().copied().collect();
            Box::pin(async move {
                let mut sets = self.sets.lock().await;
                sets.insert(cinema_key, seats);
                Ok(())
            })
        }
    }

    /// Sequential id generator for tests that construct domain values
    /// by hand rather than going through a capability trait.
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        next: AtomicI64,
    }

    impl SequentialIdGenerator {
        /// Start the generator at `1`.
        #[must_use]
        pub fn new() -> Self {
            Self { next: AtomicI64::new(1) }
        }

        /// Return the next id and advance the counter.
        pub fn next_id(&self) -> i64 {
            self.next.fetch_add(1, Ordering::Relaxed)
        }
    }

    /// Bundle of the two in-memory test doubles, convenient for tests
    /// that need both the durable store and the fast index wired up.
    pub struct InMemoryHarness {
        /// The durable-store double.
        pub store: Arc<InMemoryStore>,
        /// The fast-index double.
        pub fast_index: Arc<InMemoryFastIndex>,
    }

    impl InMemoryHarness {
        /// Construct a fresh, empty harness.
        #[must_use]
        pub fn new() -> Self {
            Self {
                store: Arc::new(InMemoryStore::new()),
                fast_index: Arc::new(InMemoryFastIndex::new()),
            }
        }
    }

    impl Default for InMemoryHarness {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::{FixedClock, InMemoryFastIndex, InMemoryStore};
    use chrono::Utc;
    use cinema_core::{AtomicClaim, CinemaCreate, CinemaLookup, ClaimOutcome, Clock, NewCinema, SeatCoord};

    #[tokio::test]
    async fn store_create_then_lookup_round_trips() {
        let store = InMemoryStore::new();
        let created = store
            .create(NewCinema {
                name: "Grand Cinema Downtown".to_owned(),
                slug: "grand-cinema-downtown".to_owned(),
                rows: 10,
                columns: 15,
                min_distance: 2,
            })
            .await
            .unwrap();

        let found = store.find_by_slug(&created.slug).await.unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn store_rejects_duplicate_name() {
        let store = InMemoryStore::new();
        let new_cinema = NewCinema {
            name: "Grand Cinema Downtown".to_owned(),
            slug: "grand-cinema-downtown".to_owned(),
            rows: 10,
            columns: 15,
            min_distance: 2,
        };
        store.create(new_cinema.clone()).await.unwrap();
        assert!(store.create(new_cinema).await.is_err());
    }

    #[tokio::test]
    async fn fast_index_claim_then_conflict() {
        let index = InMemoryFastIndex::new();
        let seats = vec![SeatCoord::new(0, 0)];
        let outcome = index.claim("cinema:1:seats", 0, &seats).await.unwrap();
        assert_eq!(outcome, ClaimOutcome::Claimed);

        let outcome = index.claim("cinema:1:seats", 0, &seats).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::Conflict(_)));
    }

    #[tokio::test]
    async fn fast_index_enforces_min_distance() {
        let index = InMemoryFastIndex::new();
        index.claim("cinema:1:seats", 2, &[SeatCoord::new(2, 2)]).await.unwrap();
        let outcome = index.claim("cinema:1:seats", 2, &[SeatCoord::new(2, 3)]).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::DistanceViolation(_)));
    }

    #[test]
    fn fixed_clock_is_stable() {
        let fixed = Utc::now();
        let clock = FixedClock::new(fixed);
        assert_eq!(clock.now(), fixed);
    }
}
