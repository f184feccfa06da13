//! Room repository implementation
//!
//! Provides PostgreSQL-backed storage for the room inventory, including the
//! availability query that excludes rooms with overlapping active bookings.

use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    models::{Room, RoomType},
    traits::{Repository, RoomRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, instrument};

const ROOM_COLUMNS: &str = "id, number, room_type, floor, capacity, price_per_night, \
     description, is_available, created_at, updated_at";

/// PostgreSQL implementation of RoomRepository
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    /// Create a new room repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse room type from string
    fn parse_type(s: &str) -> RoomType {
        RoomType::from_str(s).unwrap_or(RoomType::Standard)
    }

    /// Lock the room row for the rest of the transaction. Serializes
    /// concurrent booking attempts on the same room so the overlap re-check
    /// that follows cannot race.
    pub async fn lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<Option<Room>> {
        let result = sqlx::query_as::<sqlx::Postgres, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error locking room {}: {}", id, e);
            AppError::Database(format!("Failed to lock room: {}", e))
        })?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl Repository<Room, i32> for PgRoomRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Room>> {
        debug!("Finding room by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding room {}: {}", id, e);
            AppError::Database(format!("Failed to find room: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Room>> {
        let rows = sqlx::query_as::<sqlx::Postgres, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms ORDER BY number LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding rooms: {}", e);
            AppError::Database(format!("Failed to fetch rooms: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting rooms: {}", e);
                AppError::Database(format!("Failed to count rooms: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Room) -> AppResult<Room> {
        debug!("Creating room: {}", entity.number);

        let row = sqlx::query_as::<sqlx::Postgres, RoomRow>(&format!(
            r#"
            INSERT INTO rooms (number, room_type, floor, capacity, price_per_night,
                               description, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ROOM_COLUMNS}
            "#
        ))
        .bind(&entity.number)
        .bind(entity.room_type.code())
        .bind(entity.floor)
        .bind(entity.capacity)
        .bind(entity.price_per_night)
        .bind(&entity.description)
        .bind(entity.is_available)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::AlreadyExists(format!("Room number {}", entity.number));
            }
            error!("Database error creating room: {}", e);
            AppError::Database(format!("Failed to create room: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Room) -> AppResult<Room> {
        debug!("Updating room: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, RoomRow>(&format!(
            r#"
            UPDATE rooms
            SET number = $2,
                room_type = $3,
                floor = $4,
                capacity = $5,
                price_per_night = $6,
                description = $7,
                is_available = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ROOM_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.number)
        .bind(entity.room_type.code())
        .bind(entity.floor)
        .bind(entity.capacity)
        .bind(entity.price_per_night)
        .bind(&entity.description)
        .bind(entity.is_available)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating room {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update room: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting room: {}", id);

        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting room {}: {}", id, e);
                AppError::Database(format!("Failed to delete room: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    #[instrument(skip(self))]
    async fn find_by_number(&self, number: &str) -> AppResult<Option<Room>> {
        let result = sqlx::query_as::<sqlx::Postgres, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE number = $1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding room by number: {}", e);
            AppError::Database(format!("Failed to find room: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_filtered(
        &self,
        room_type: Option<&str>,
        floor: Option<i32>,
        min_capacity: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Room>, i64)> {
        let rows = sqlx::query_as::<sqlx::Postgres, RoomRow>(&format!(
            r#"
            SELECT {ROOM_COLUMNS}
            FROM rooms
            WHERE ($1::text IS NULL OR room_type = $1)
                AND ($2::int IS NULL OR floor = $2)
                AND ($3::int IS NULL OR capacity >= $3)
            ORDER BY number
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(room_type)
        .bind(floor)
        .bind(min_capacity)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing rooms: {}", e);
            AppError::Database(format!("Failed to list rooms: {}", e))
        })?;

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM rooms
            WHERE ($1::text IS NULL OR room_type = $1)
                AND ($2::int IS NULL OR floor = $2)
                AND ($3::int IS NULL OR capacity >= $3)
            "#,
        )
        .bind(room_type)
        .bind(floor)
        .bind(min_capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting filtered rooms: {}", e);
            AppError::Database(format!("Failed to count rooms: {}", e))
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn find_available(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_type: Option<&str>,
        min_capacity: Option<i32>,
    ) -> AppResult<Vec<Room>> {
        debug!("Searching rooms free between {} and {}", check_in, check_out);

        // Half-open overlap: an active booking blocks the room iff
        // booking.check_in < $2 AND $1 < booking.check_out
        let rows = sqlx::query_as::<sqlx::Postgres, RoomRow>(&format!(
            r#"
            SELECT {ROOM_COLUMNS}
            FROM rooms r
            WHERE r.is_available = TRUE
                AND ($3::text IS NULL OR r.room_type = $3)
                AND ($4::int IS NULL OR r.capacity >= $4)
                AND NOT EXISTS (
                    SELECT 1 FROM bookings b
                    WHERE b.room_id = r.id
                        AND b.status IN ('confirmed', 'checked_in')
                        AND b.check_in < $2
                        AND $1 < b.check_out
                )
            ORDER BY r.number
            "#
        ))
        .bind(check_in)
        .bind(check_out)
        .bind(room_type)
        .bind(min_capacity)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error searching available rooms: {}", e);
            AppError::Database(format!("Failed to search available rooms: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Whether a sqlx error is a unique constraint violation
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: i32,
    number: String,
    room_type: String,
    floor: i32,
    capacity: i32,
    price_per_night: Decimal,
    description: Option<String>,
    is_available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id,
            number: row.number,
            room_type: PgRoomRepository::parse_type(&row.room_type),
            floor: row.floor,
            capacity: row.capacity,
            price_per_night: row.price_per_night,
            description: row.description,
            is_available: row.is_available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type() {
        assert_eq!(PgRoomRepository::parse_type("deluxe"), RoomType::Deluxe);
        assert_eq!(PgRoomRepository::parse_type("suite"), RoomType::Suite);
        // unknown codes fall back to standard
        assert_eq!(PgRoomRepository::parse_type("igloo"), RoomType::Standard);
    }
}
