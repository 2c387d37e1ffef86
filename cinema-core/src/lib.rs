//! # Cinema Reservation Core
//!
//! Domain types, grid geometry, error taxonomy, and the capability-set
//! traits that the reservation coordinator depends on.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON
//! ├─────────────────────────────────────────┤
//! │         Reservation Coordinator         │  ← claim → persist → compensate
//! ├──────────────────────┬──────────────────┤
//! │   Fast Index (C2)    │  Durable Store   │  ← capability traits, this crate
//! │   Redis (crate)      │  Postgres (crate)│
//! └──────────────────────┴──────────────────┘
//! ```
//!
//! This crate defines the traits (`CinemaLookup`, `AtomicClaim`, …) as
//! dyn-compatible async traits — `Pin<Box<dyn Future<..> + Send + '_>>`
//! return types instead of `async fn` — so the coordinator can hold them
//! as `Arc<dyn Trait>` fields in a capability-set environment struct and
//! swap in in-memory test doubles without changing its own code.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod model;

pub use capability::{
    AtomicClaim, AtomicRelease, CancelSeatsById, CinemaCreate, CinemaLookup, CreateReservation,
    FindSeats, ReadMembers, SeedAllSeats, SeedIndex,
};
pub use coordinator::{
    CancelSeatsRequest, DurableStore, FastIndex, ReadinessReport, ReservationCoordinator, ReserveSeatsRequest,
};
pub use environment::Clock;
pub use error::{ClaimOutcome, CoordinatorError, FastIndexError, GeometryError, StoreError};
pub use geometry::Heatmap;
pub use model::{Cinema, NewCinema, NewReservation, Reservation, ReservedSeat, SeatCoord};
