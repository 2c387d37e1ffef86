//! Error taxonomy shared by the coordinator, the fast index, and the
//! durable store.
//!
//! Each storage layer owns its own `thiserror` enum; the coordinator maps
//! these into its own [`CoordinatorError`], which the web layer in turn
//! maps into the stable HTTP `code` strings of the external interface.

use crate::model::SeatCoord;
use thiserror::Error;

/// Outcome of an [`crate::capability::AtomicClaim`] call, named so
/// callers can pattern-match without allocating a fresh error type per
/// site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// All seats were inserted.
    Claimed,
    /// One or more seats were already members.
    Conflict(Vec<SeatCoord>),
    /// The batch, combined with existing members, violates the minimum
    /// distance rule.
    DistanceViolation(Vec<SeatCoord>),
}

/// Errors from the fast reserved-seat index (Redis).
#[derive(Error, Debug)]
pub enum FastIndexError {
    /// One or more seats are already claimed. Maps to `SEATS_RESERVED`.
    #[error("seats already reserved: {0:?}")]
    Conflict(Vec<SeatCoord>),

    /// The batch violates the minimum-distance rule. Maps to
    /// `MIN_DISTANCE_VIOLATION`.
    #[error("minimum distance violated: {0:?}")]
    DistanceViolation(Vec<SeatCoord>),

    /// Transport or script-execution failure. Maps to `INTERNAL_ERROR`.
    #[error("fast index transport error: {0}")]
    Internal(String),
}

/// Errors from the durable relational store (Postgres).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A unique constraint was violated (duplicate cinema name/slug, or
    /// duplicate `(cinema_id, row, column)`).
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// Connection pool, query, or transaction failure.
    #[error("database error: {0}")]
    Database(String),
}

/// Errors from the pure grid-geometry module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// `rows` or `columns` was zero.
    #[error("grid must be non-empty: rows={rows}, columns={columns}")]
    EmptyGrid {
        /// Requested row count.
        rows: i32,
        /// Requested column count.
        columns: i32,
    },
}

/// Errors surfaced by the reservation coordinator (C4), one variant per
/// distinct step-failure named in the component design.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Cinema slug did not resolve. HTTP 404 `CINEMA_NOT_FOUND`.
    #[error("cinema not found")]
    CinemaNotFound,

    /// Cinema name already taken. HTTP 409 `CINEMA_EXISTS`.
    #[error("cinema already exists")]
    CinemaAlreadyExists,

    /// A coordinate fell outside `[0, rows) x [0, columns)`. HTTP 400
    /// `INVALID_SEAT_POSITION`.
    #[error("invalid seat position")]
    InvalidSeatPosition,

    /// `AtomicClaim` reported a conflict. HTTP 409 `SEATS_RESERVED`.
    #[error("seats already reserved: {0:?}")]
    SeatsAlreadyReserved(Vec<SeatCoord>),

    /// `AtomicClaim` reported a distance violation. HTTP 400
    /// `MIN_DISTANCE_VIOLATION`.
    #[error("minimum distance violated: {0:?}")]
    MinDistanceViolation(Vec<SeatCoord>),

    /// `FindReservedSeats` returned fewer rows than requested coordinates
    /// during cancellation. HTTP 409 `SEATS_NOT_AVAILABLE`.
    #[error("one or more seats are not currently reserved")]
    SeatsNotReserved,

    /// Request-level validation failure (empty seat list, short name,
    /// non-positive grid dimension). HTTP 400 `VALIDATION_ERROR`.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transient infra failure (store connectivity, script load). HTTP
    /// 500 `INTERNAL_ERROR`.
    #[error("internal error: {0}")]
    Internal(String),

    /// Invariant breach: durable persist failed *and* the fast-index
    /// compensation also failed. Cross-store divergence is possible
    /// until the next seed. Logged CRITICAL by the caller; HTTP 500
    /// `INTERNAL_ERROR` to the client.
    #[error("compensation failed after persist failure: rollback_error={rollback_error}, original_error={original_error}")]
    CompensationFailed {
        /// The error that triggered the rollback attempt.
        original_error: String,
        /// The error the rollback attempt itself raised.
        rollback_error: String,
    },
}

impl From<FastIndexError> for CoordinatorError {
    fn from(err: FastIndexError) -> Self {
        match err {
            FastIndexError::Conflict(seats) => Self::SeatsAlreadyReserved(seats),
            FastIndexError::DistanceViolation(seats) => Self::MinDistanceViolation(seats),
            FastIndexError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::CinemaNotFound,
            StoreError::Conflict(msg) => Self::Internal(msg),
            StoreError::Database(msg) => Self::Internal(msg),
        }
    }
}
