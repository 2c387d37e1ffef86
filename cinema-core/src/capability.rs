//! Capability-set traits the reservation coordinator depends on.
//!
//! Every trait here is dyn-compatible: methods return
//! `Pin<Box<dyn Future<Output = ..> + Send + '_>>` instead of using
//! `async fn`, so a coordinator can hold implementations as
//! `Arc<dyn Trait>` fields and swap production adapters (`cinema-postgres`,
//! `cinema-redis`) for the in-memory doubles in `cinema-testing` without
//! any change to its own code.
//!
//! Traits split along two capability sets: `{CinemaLookup, CinemaCreate,
//! CreateReservation, FindSeats, CancelSeatsById, SeedAllSeats}` for the
//! durable store, and `{AtomicClaim, AtomicRelease, ReadMembers,
//! SeedIndex}` for the fast index.

use crate::error::{ClaimOutcome, FastIndexError, StoreError};
use crate::model::{Cinema, NewCinema, NewReservation, Reservation, ReservedSeat, SeatCoord};
use std::future::Future;
use std::pin::Pin;

/// Look up a cinema by its slug.
pub trait CinemaLookup: Send + Sync {
    /// Fetch a cinema by slug. Returns [`StoreError::NotFound`] if no
    /// such cinema exists.
    fn find_by_slug(
        &self,
        slug: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Cinema, StoreError>> + Send + '_>>;
}

/// Create a new cinema.
pub trait CinemaCreate: Send + Sync {
    /// Persist a new cinema. Returns [`StoreError::Conflict`] if the
    /// name or slug already exists.
    fn create(
        &self,
        cinema: NewCinema,
    ) -> Pin<Box<dyn Future<Output = Result<Cinema, StoreError>> + Send + '_>>;
}

/// Durably persist a reservation and its seats in one transaction.
pub trait CreateReservation: Send + Sync {
    /// Persist `reservation`. Returns [`StoreError::Conflict`] if any
    /// `(cinema_id, row, column)` already has a live row.
    fn create(
        &self,
        reservation: NewReservation,
    ) -> Pin<Box<dyn Future<Output = Result<Reservation, StoreError>> + Send + '_>>;
}

/// Resolve coordinates to their durable `ReservedSeat` rows.
pub trait FindSeats: Send + Sync {
    /// Return the subset of `coords` that currently has a live
    /// `ReservedSeat` row for `cinema_id`.
    fn find_reserved(
        &self,
        cinema_id: i64,
        coords: &[SeatCoord],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ReservedSeat>, StoreError>> + Send + '_>>;
}

/// Cancel durably-persisted seats by id.
pub trait CancelSeatsById: Send + Sync {
    /// Soft-delete the given seat ids in a single transaction.
    fn cancel(
        &self,
        seat_ids: &[i64],
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;
}

/// Read every live seat for every cinema, for fast-index seeding.
pub trait SeedAllSeats: Send + Sync {
    /// Return all live `ReservedSeat` rows, grouped by no particular
    /// order; callers group by `cinema_id` themselves.
    fn all_reserved_seats(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ReservedSeat>, StoreError>> + Send + '_>>;
}

/// Atomic multi-seat claim against the fast index (C2).
pub trait AtomicClaim: Send + Sync {
    /// Attempt to claim every coordinate in `seats` against
    /// `cinema_key` in one atomic operation, honoring `min_distance`
    /// against both existing members and the batch itself.
    ///
    /// Returns [`ClaimOutcome::Conflict`] or
    /// [`ClaimOutcome::DistanceViolation`] naming the offending seats
    /// on failure; never partially applies the batch.
    fn claim(
        &self,
        cinema_key: &str,
        min_distance: i32,
        seats: &[SeatCoord],
    ) -> Pin<Box<dyn Future<Output = Result<ClaimOutcome, FastIndexError>> + Send + '_>>;
}

/// Release fast-index membership, used for compensation and cancel.
pub trait AtomicRelease: Send + Sync {
    /// Remove each of `seats` from `cinema_key`'s set. Missing members
    /// are ignored; this is idempotent.
    fn release(
        &self,
        cinema_key: &str,
        seats: &[SeatCoord],
    ) -> Pin<Box<dyn Future<Output = Result<(), FastIndexError>> + Send + '_>>;
}

/// Read current fast-index membership for a cinema.
pub trait ReadMembers: Send + Sync {
    /// Every coordinate currently claimed under `cinema_key`.
    fn members(
        &self,
        cinema_key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SeatCoord>, FastIndexError>> + Send + '_>>;
}

/// Replace a cinema's fast-index set wholesale, used only at startup.
pub trait SeedIndex: Send + Sync {
    /// Overwrite `cinema_key`'s member set with exactly `seats`. This
    /// is the only sanctioned way to mutate fast-index state outside
    /// the claim/release path.
    fn seed(
        &self,
        cinema_key: &str,
        seats: &[SeatCoord],
    ) -> Pin<Box<dyn Future<Output = Result<(), FastIndexError>> + Send + '_>>;
}
