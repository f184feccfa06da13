//! Booking repository implementation
//!
//! Provides PostgreSQL-backed storage for bookings with the overlap
//! predicate used by the double-booking guard.

use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    models::{Booking, BookingStatus},
    traits::{BookingRepository, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, instrument};

const BOOKING_COLUMNS: &str = "id, room_id, guest_name, guest_phone, guest_email, guest_id, \
     check_in, check_out, total_price, status, special_requests, notes, \
     created_at, updated_at";

/// PostgreSQL implementation of BookingRepository
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse booking status from string
    fn parse_status(s: &str) -> BookingStatus {
        BookingStatus::from_str(s).unwrap_or(BookingStatus::Pending)
    }

    /// Insert a booking inside an open transaction. Used by the booking
    /// creation flow, which holds a room lock while re-checking overlap.
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entity: &Booking,
    ) -> AppResult<Booking> {
        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (room_id, guest_name, guest_phone, guest_email, guest_id,
                                  check_in, check_out, total_price, status,
                                  special_requests, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(entity.room_id)
        .bind(&entity.guest_name)
        .bind(&entity.guest_phone)
        .bind(&entity.guest_email)
        .bind(entity.guest_id)
        .bind(entity.check_in)
        .bind(entity.check_out)
        .bind(entity.total_price)
        .bind(entity.status.to_string())
        .bind(&entity.special_requests)
        .bind(&entity.notes)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error creating booking: {}", e);
            AppError::Database(format!("Failed to create booking: {}", e))
        })?;

        Ok(row.into())
    }

    /// Fetch a booking inside an open transaction
    pub async fn find_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<Option<Booking>> {
        let result = sqlx::query_as::<sqlx::Postgres, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error finding booking {}: {}", id, e);
            AppError::Database(format!("Failed to find booking: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    /// Update a booking inside an open transaction. Used by confirmation,
    /// which must hold the room lock while the status flips.
    pub async fn update_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entity: &Booking,
    ) -> AppResult<Booking> {
        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET room_id = $2,
                guest_name = $3,
                guest_phone = $4,
                guest_email = $5,
                guest_id = $6,
                check_in = $7,
                check_out = $8,
                total_price = $9,
                status = $10,
                special_requests = $11,
                notes = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.room_id)
        .bind(&entity.guest_name)
        .bind(&entity.guest_phone)
        .bind(&entity.guest_email)
        .bind(entity.guest_id)
        .bind(entity.check_in)
        .bind(entity.check_out)
        .bind(entity.total_price)
        .bind(entity.status.to_string())
        .bind(&entity.special_requests)
        .bind(&entity.notes)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error updating booking {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update booking: {}", e))
        })?;

        Ok(row.into())
    }

    /// Overlap check against active bookings, inside an open transaction
    /// after the room row has been locked. Half-open ranges: a booking
    /// checking out on a given day does not collide with one checking in
    /// that day.
    pub async fn has_active_overlap_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        room_id: i32,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude_booking_id: Option<i32>,
    ) -> AppResult<bool> {
        let result: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE room_id = $1
                    AND status IN ('confirmed', 'checked_in')
                    AND check_in < $3
                    AND $2 < check_out
                    AND ($4::int IS NULL OR id <> $4)
            )
            "#,
        )
        .bind(room_id)
        .bind(check_in)
        .bind(check_out)
        .bind(exclude_booking_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error checking booking overlap: {}", e);
            AppError::Database(format!("Failed to check booking overlap: {}", e))
        })?;

        Ok(result.0)
    }
}

#[async_trait]
impl Repository<Booking, i32> for PgBookingRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Booking>> {
        debug!("Finding booking by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding booking {}: {}", id, e);
            AppError::Database(format!("Failed to find booking: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<sqlx::Postgres, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding bookings: {}", e);
            AppError::Database(format!("Failed to fetch bookings: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting bookings: {}", e);
                AppError::Database(format!("Failed to count bookings: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Booking) -> AppResult<Booking> {
        debug!("Creating booking for room {}", entity.room_id);

        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (room_id, guest_name, guest_phone, guest_email, guest_id,
                                  check_in, check_out, total_price, status,
                                  special_requests, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(entity.room_id)
        .bind(&entity.guest_name)
        .bind(&entity.guest_phone)
        .bind(&entity.guest_email)
        .bind(entity.guest_id)
        .bind(entity.check_in)
        .bind(entity.check_out)
        .bind(entity.total_price)
        .bind(entity.status.to_string())
        .bind(&entity.special_requests)
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating booking: {}", e);
            AppError::Database(format!("Failed to create booking: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Booking) -> AppResult<Booking> {
        debug!("Updating booking: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET room_id = $2,
                guest_name = $3,
                guest_phone = $4,
                guest_email = $5,
                guest_id = $6,
                check_in = $7,
                check_out = $8,
                total_price = $9,
                status = $10,
                special_requests = $11,
                notes = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.room_id)
        .bind(&entity.guest_name)
        .bind(&entity.guest_phone)
        .bind(&entity.guest_email)
        .bind(entity.guest_id)
        .bind(entity.check_in)
        .bind(entity.check_out)
        .bind(entity.total_price)
        .bind(entity.status.to_string())
        .bind(&entity.special_requests)
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating booking {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update booking: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting booking: {}", id);

        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting booking {}: {}", id, e);
                AppError::Database(format!("Failed to delete booking: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    #[instrument(skip(self))]
    async fn list_filtered(
        &self,
        room_id: Option<i32>,
        status: Option<BookingStatus>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Booking>, i64)> {
        let status_str = status.map(|s| s.to_string());

        let rows = sqlx::query_as::<sqlx::Postgres, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE ($1::int IS NULL OR room_id = $1)
                AND ($2::text IS NULL OR status = $2)
                AND ($3::date IS NULL OR check_out > $3)
                AND ($4::date IS NULL OR check_in < $4)
            ORDER BY check_in DESC, id DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(room_id)
        .bind(&status_str)
        .bind(from)
        .bind(to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing bookings: {}", e);
            AppError::Database(format!("Failed to list bookings: {}", e))
        })?;

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE ($1::int IS NULL OR room_id = $1)
                AND ($2::text IS NULL OR status = $2)
                AND ($3::date IS NULL OR check_out > $3)
                AND ($4::date IS NULL OR check_in < $4)
            "#,
        )
        .bind(room_id)
        .bind(&status_str)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting filtered bookings: {}", e);
            AppError::Database(format!("Failed to count bookings: {}", e))
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn find_arrivals(&self, date: NaiveDate) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<sqlx::Postgres, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE check_in = $1 AND status = 'confirmed'
            ORDER BY id
            "#
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding arrivals: {}", e);
            AppError::Database(format!("Failed to find arrivals: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: i32,
    room_id: i32,
    guest_name: String,
    guest_phone: String,
    guest_email: Option<String>,
    guest_id: Option<i32>,
    check_in: NaiveDate,
    check_out: NaiveDate,
    total_price: Decimal,
    status: String,
    special_requests: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id,
            guest_name: row.guest_name,
            guest_phone: row.guest_phone,
            guest_email: row.guest_email,
            guest_id: row.guest_id,
            check_in: row.check_in,
            check_out: row.check_out,
            total_price: row.total_price,
            status: PgBookingRepository::parse_status(&row.status),
            special_requests: row.special_requests,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(
            PgBookingRepository::parse_status("confirmed"),
            BookingStatus::Confirmed
        );
        assert_eq!(
            PgBookingRepository::parse_status("checked_in"),
            BookingStatus::CheckedIn
        );
        // unknown statuses fall back to pending
        assert_eq!(
            PgBookingRepository::parse_status("mystery"),
            BookingStatus::Pending
        );
    }
}
