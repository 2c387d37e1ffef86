//! `PostgreSQL`-backed durable store (C3) for the cinema reservation
//! engine.
//!
//! `Cinema`, `Reservation`, and `ReservedSeat` rows live in three
//! tables with the constraints described in the data model: unique
//! `(name, slug)` on cinemas, and a partial unique index on
//! `(cinema_id, row_index, column_index)` over live (non-canceled)
//! reserved seats. `PgStore::create_reservation` persists a
//! reservation and all of its seats in a single transaction; any
//! constraint violation aborts the whole reservation.
//!
//! # Example
//!
//! ```ignore
//! use cinema_postgres::PgStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PgStore::connect("postgres://localhost/cinema", 10, 1).await?;
//!     store.run_migrations().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use chrono::{DateTime, Utc};
use cinema_core::{
    CancelSeatsById, Cinema, CinemaCreate, CinemaLookup, CreateReservation, FindSeats, NewCinema, NewReservation,
    Reservation, ReservedSeat, SeatCoord, SeedAllSeats, StoreError,
};
use cinema_runtime::metrics::DurableStoreMetrics;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.message().to_owned())
        }
        _ => {
            tracing::error!(error = %err, "unexpected database error");
            StoreError::Database(err.to_string())
        }
    }
}

/// `PostgreSQL`-backed durable store.
///
/// Holds a bounded `sqlx` connection pool; cheap to clone (an `Arc`
/// internally) and safe to share across request handlers.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to `database_url` with a bounded pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pool cannot be
    /// established within `connect_timeout`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Wrap an already-constructed pool, used by tests that set up
    /// their own `testcontainers` instance.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the crate's embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if any migration fails to
    /// apply.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Ping the database with a short deadline, used by the
    /// readiness health check.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the ping does not complete
    /// before `deadline`.
    pub async fn ping(&self, deadline: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(deadline, sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map_err(|_| StoreError::Database("health check timed out".to_owned()))?
            .map_err(map_sqlx_error)
            .map(|_| ())
    }

    fn row_to_cinema(row: &sqlx::postgres::PgRow) -> Cinema {
        Cinema {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
            rows: row.get("rows"),
            columns: row.get("columns"),
            min_distance: row.get("min_distance"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        }
    }

    fn row_to_seat(row: &sqlx::postgres::PgRow) -> ReservedSeat {
        ReservedSeat {
            id: row.get("id"),
            cinema_id: row.get("cinema_id"),
            reservation_id: row.get("reservation_id"),
            row: row.get("row_index"),
            column: row.get("column_index"),
        }
    }
}

impl CinemaLookup for PgStore {
    fn find_by_slug(&self, slug: &str) -> Pin<Box<dyn Future<Output = Result<Cinema, StoreError>> + Send + '_>> {
        let slug = slug.to_owned();
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, name, slug, rows, columns, min_distance, created_at, updated_at \
                 FROM cinemas WHERE slug = $1",
            )
            .bind(&slug)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
            Ok(Self::row_to_cinema(&row))
        })
    }
}

impl CinemaCreate for PgStore {
    fn create(&self, cinema: NewCinema) -> Pin<Box<dyn Future<Output = Result<Cinema, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let row = sqlx::query(
                "INSERT INTO cinemas (name, slug, rows, columns, min_distance) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, name, slug, rows, columns, min_distance, created_at, updated_at",
            )
            .bind(&cinema.name)
            .bind(&cinema.slug)
            .bind(cinema.rows)
            .bind(cinema.columns)
            .bind(cinema.min_distance)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
            Ok(Self::row_to_cinema(&row))
        })
    }
}

impl CreateReservation for PgStore {
    fn create(
        &self,
        reservation: NewReservation,
    ) -> Pin<Box<dyn Future<Output = Result<Reservation, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let started = Instant::now();
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

            let row = sqlx::query(
                "INSERT INTO reservations (cinema_id, note) VALUES ($1, $2) \
                 RETURNING id, cinema_id, note, reserved_at",
            )
            .bind(reservation.cinema_id)
            .bind(&reservation.note)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            let reservation_id: i64 = row.get("id");
            let reserved_at: DateTime<Utc> = row.get("reserved_at");

            let mut seats = Vec::with_capacity(reservation.seats.len());
            for coord in &reservation.seats {
                let seat_row = sqlx::query(
                    "INSERT INTO reserved_seats (cinema_id, reservation_id, row_index, column_index) \
                     VALUES ($1, $2, $3, $4) \
                     RETURNING id, cinema_id, reservation_id, row_index, column_index",
                )
                .bind(reservation.cinema_id)
                .bind(reservation_id)
                .bind(coord.row)
                .bind(coord.column)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
                seats.push(Self::row_to_seat(&seat_row));
            }

            tx.commit().await.map_err(map_sqlx_error)?;
            DurableStoreMetrics::record_create(started.elapsed());

            Ok(Reservation {
                id: reservation_id,
                cinema_id: reservation.cinema_id,
                note: reservation.note,
                reserved_at,
                seats,
            })
        })
    }
}

impl FindSeats for PgStore {
    fn find_reserved(
        &self,
        cinema_id: i64,
        coords: &[SeatCoord],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ReservedSeat>, StoreError>> + Send + '_>> {
        let coords: Vec<SeatCoord> = coords.to_vec();
        Box::pin(async move {
            let rows: Vec<i32> = coords.iter().map(|c| c.row).collect();
            let cols: Vec<i32> = coords.iter().map(|c| c.column).collect();

            let query_rows = sqlx::query(
                "SELECT id, cinema_id, reservation_id, row_index, column_index \
                 FROM reserved_seats \
                 WHERE cinema_id = $1 AND canceled_at IS NULL \
                   AND (row_index, column_index) = ANY (SELECT * FROM UNNEST($2::int[], $3::int[]))",
            )
            .bind(cinema_id)
            .bind(&rows)
            .bind(&cols)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            Ok(query_rows.iter().map(Self::row_to_seat).collect())
        })
    }
}

impl CancelSeatsById for PgStore {
    fn cancel(&self, seat_ids: &[i64]) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let seat_ids: Vec<i64> = seat_ids.to_vec();
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
            sqlx::query("UPDATE reserved_seats SET canceled_at = now() WHERE id = ANY($1) AND canceled_at IS NULL")
                .bind(&seat_ids)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            tx.commit().await.map_err(map_sqlx_error)?;
            DurableStoreMetrics::record_cancel();
            Ok(())
        })
    }
}

impl SeedAllSeats for PgStore {
    fn all_reserved_seats(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ReservedSeat>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT id, cinema_id, reservation_id, row_index, column_index \
                 FROM reserved_seats WHERE canceled_at IS NULL",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
            Ok(rows.iter().map(Self::row_to_seat).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_conflict() {
        // sqlx::Error doesn't construct easily outside a live connection;
        // the mapping itself is exercised end-to-end in
        // tests/integration_tests.rs against a real Postgres instance.
        let err = StoreError::Conflict("duplicate key value violates unique constraint".to_owned());
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
