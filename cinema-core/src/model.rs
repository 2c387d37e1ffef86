//! Domain data model: Cinema, Reservation, ReservedSeat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named grid of seats with a minimum-distance rule.
///
/// Immutable after creation: rows, columns, and `min_distance` never
/// change once a cinema exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cinema {
    /// Stable integer identity.
    pub id: i64,
    /// Unique, trimmed, ≥5 visible characters.
    pub name: String,
    /// URL-safe slug derived from `name`.
    pub slug: String,
    /// Number of rows, ≥1. Valid row coordinates are `[0, rows)`.
    pub rows: i32,
    /// Number of columns, ≥1. Valid column coordinates are `[0, columns)`.
    pub columns: i32,
    /// Minimum Manhattan distance required between any two reserved seats.
    pub min_distance: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp (cinemas are immutable post-creation, but the
    /// column is carried for symmetry with the durable schema).
    pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::capability::CinemaCreate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCinema {
    /// Trimmed display name.
    pub name: String,
    /// Slug derived from `name`.
    pub slug: String,
    /// Number of rows, ≥1.
    pub rows: i32,
    /// Number of columns, ≥1.
    pub columns: i32,
    /// Minimum Manhattan distance, ≥0.
    pub min_distance: i32,
}

/// A zero-indexed grid cell `(row, column)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatCoord {
    /// Row, `[0, rows)`.
    pub row: i32,
    /// Column, `[0, columns)`.
    pub column: i32,
}

impl SeatCoord {
    /// Construct a new coordinate.
    #[must_use]
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    /// Manhattan distance to another coordinate.
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> i32 {
        (self.row - other.row).abs() + (self.column - other.column).abs()
    }

    /// Redis fast-index field representation: `"<row>:<col>"`.
    #[must_use]
    pub fn field_key(self) -> String {
        format!("{}:{}", self.row, self.column)
    }
}

/// A group booking: a non-empty ordered sequence of [`ReservedSeat`] children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Stable integer identity.
    pub id: i64,
    /// Owning cinema.
    pub cinema_id: i64,
    /// Optional free-text note.
    pub note: Option<String>,
    /// Commit timestamp.
    pub reserved_at: DateTime<Utc>,
    /// The seats this reservation claims, in request order.
    pub seats: Vec<ReservedSeat>,
}

/// Input to [`crate::capability::CreateReservation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    /// Owning cinema.
    pub cinema_id: i64,
    /// Optional free-text note.
    pub note: Option<String>,
    /// Coordinates to persist as [`ReservedSeat`] rows.
    pub seats: Vec<SeatCoord>,
}

/// A single claimed grid cell, durably persisted.
///
/// Invariant I1: `(cinema_id, row, column)` is unique across all live
/// (non-canceled) reserved seats. Invariant I2: any two live reserved
/// seats in the same cinema satisfy `manhattan_distance >= min_distance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedSeat {
    /// Stable integer identity.
    pub id: i64,
    /// Owning cinema.
    pub cinema_id: i64,
    /// Owning reservation.
    pub reservation_id: i64,
    /// Row coordinate.
    pub row: i32,
    /// Column coordinate.
    pub column: i32,
}

impl ReservedSeat {
    /// This seat's coordinate, independent of its id/reservation.
    #[must_use]
    pub const fn coord(&self) -> SeatCoord {
        SeatCoord {
            row: self.row,
            column: self.column,
        }
    }
}
