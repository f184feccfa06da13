//! Guest and visit repository implementations
//!
//! Guests are the registry of identities; visits are the per-stay occupancy
//! records opened at check-in and closed at check-out.

use chrono::{DateTime, Utc};
use innkeep_core::{
    models::{Guest, GuestVisit},
    traits::{GuestRepository, Repository, VisitRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, instrument};

const GUEST_COLUMNS: &str =
    "id, first_name, last_name, phone, email, doc_number, created_at, updated_at";

const VISIT_COLUMNS: &str = "id, guest_id, booking_id, room_id, checkin_at, checkout_at, \
     base_amount, services_amount, total_amount";

/// PostgreSQL implementation of GuestRepository
pub struct PgGuestRepository {
    pool: PgPool,
}

impl PgGuestRepository {
    /// Create a new guest repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Guest, i32> for PgGuestRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Guest>> {
        debug!("Finding guest by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, GuestRow>(&format!(
            "SELECT {GUEST_COLUMNS} FROM guests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding guest {}: {}", id, e);
            AppError::Database(format!("Failed to find guest: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Guest>> {
        let rows = sqlx::query_as::<sqlx::Postgres, GuestRow>(&format!(
            "SELECT {GUEST_COLUMNS} FROM guests ORDER BY last_name, first_name LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding guests: {}", e);
            AppError::Database(format!("Failed to fetch guests: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM guests")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting guests: {}", e);
                AppError::Database(format!("Failed to count guests: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Guest) -> AppResult<Guest> {
        debug!("Creating guest: {} {}", entity.last_name, entity.first_name);

        let row = sqlx::query_as::<sqlx::Postgres, GuestRow>(&format!(
            r#"
            INSERT INTO guests (first_name, last_name, phone, email, doc_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {GUEST_COLUMNS}
            "#
        ))
        .bind(&entity.first_name)
        .bind(&entity.last_name)
        .bind(&entity.phone)
        .bind(&entity.email)
        .bind(&entity.doc_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating guest: {}", e);
            AppError::Database(format!("Failed to create guest: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Guest) -> AppResult<Guest> {
        debug!("Updating guest: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, GuestRow>(&format!(
            r#"
            UPDATE guests
            SET first_name = $2,
                last_name = $3,
                phone = $4,
                email = $5,
                doc_number = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {GUEST_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.first_name)
        .bind(&entity.last_name)
        .bind(&entity.phone)
        .bind(&entity.email)
        .bind(&entity.doc_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating guest {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update guest: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting guest: {}", id);

        let result = sqlx::query("DELETE FROM guests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting guest {}: {}", id, e);
                AppError::Database(format!("Failed to delete guest: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl GuestRepository for PgGuestRepository {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: i64, offset: i64) -> AppResult<(Vec<Guest>, i64)> {
        let pattern = format!("%{}%", query);

        let rows = sqlx::query_as::<sqlx::Postgres, GuestRow>(&format!(
            r#"
            SELECT {GUEST_COLUMNS}
            FROM guests
            WHERE first_name ILIKE $1
                OR last_name ILIKE $1
                OR phone ILIKE $1
                OR email ILIKE $1
                OR doc_number ILIKE $1
            ORDER BY last_name, first_name
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error searching guests: {}", e);
            AppError::Database(format!("Failed to search guests: {}", e))
        })?;

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM guests
            WHERE first_name ILIKE $1
                OR last_name ILIKE $1
                OR phone ILIKE $1
                OR email ILIKE $1
                OR doc_number ILIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting guest search: {}", e);
            AppError::Database(format!("Failed to count guests: {}", e))
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn find_by_doc_number(&self, doc_number: &str) -> AppResult<Option<Guest>> {
        let result = sqlx::query_as::<sqlx::Postgres, GuestRow>(&format!(
            "SELECT {GUEST_COLUMNS} FROM guests WHERE doc_number = $1 LIMIT 1"
        ))
        .bind(doc_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding guest by document: {}", e);
            AppError::Database(format!("Failed to find guest: {}", e))
        })?;

        Ok(result.map(Into::into))
    }
}

/// PostgreSQL implementation of VisitRepository
pub struct PgVisitRepository {
    pool: PgPool,
}

impl PgVisitRepository {
    /// Create a new visit repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a visit inside an open transaction, so the check-in flow can
    /// commit the booking transition and the visit atomically.
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entity: &GuestVisit,
    ) -> AppResult<GuestVisit> {
        let row = sqlx::query_as::<sqlx::Postgres, VisitRow>(&format!(
            r#"
            INSERT INTO guest_visits (guest_id, booking_id, room_id, checkin_at,
                                      base_amount, services_amount, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(entity.guest_id)
        .bind(entity.booking_id)
        .bind(entity.room_id)
        .bind(entity.checkin_at)
        .bind(entity.base_amount)
        .bind(entity.services_amount)
        .bind(entity.total_amount)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error creating visit: {}", e);
            AppError::Database(format!("Failed to create visit: {}", e))
        })?;

        Ok(row.into())
    }

    /// Update a visit inside an open transaction
    pub async fn update_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entity: &GuestVisit,
    ) -> AppResult<GuestVisit> {
        let row = sqlx::query_as::<sqlx::Postgres, VisitRow>(&format!(
            r#"
            UPDATE guest_visits
            SET checkout_at = $2,
                base_amount = $3,
                services_amount = $4,
                total_amount = $5
            WHERE id = $1
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.checkout_at)
        .bind(entity.base_amount)
        .bind(entity.services_amount)
        .bind(entity.total_amount)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error updating visit {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update visit: {}", e))
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl Repository<GuestVisit, i32> for PgVisitRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<GuestVisit>> {
        debug!("Finding visit by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, VisitRow>(&format!(
            "SELECT {VISIT_COLUMNS} FROM guest_visits WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding visit {}: {}", id, e);
            AppError::Database(format!("Failed to find visit: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<GuestVisit>> {
        let rows = sqlx::query_as::<sqlx::Postgres, VisitRow>(&format!(
            "SELECT {VISIT_COLUMNS} FROM guest_visits ORDER BY checkin_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding visits: {}", e);
            AppError::Database(format!("Failed to fetch visits: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM guest_visits")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting visits: {}", e);
                AppError::Database(format!("Failed to count visits: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &GuestVisit) -> AppResult<GuestVisit> {
        debug!("Opening visit for booking {}", entity.booking_id);

        let row = sqlx::query_as::<sqlx::Postgres, VisitRow>(&format!(
            r#"
            INSERT INTO guest_visits (guest_id, booking_id, room_id, checkin_at,
                                      base_amount, services_amount, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(entity.guest_id)
        .bind(entity.booking_id)
        .bind(entity.room_id)
        .bind(entity.checkin_at)
        .bind(entity.base_amount)
        .bind(entity.services_amount)
        .bind(entity.total_amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if crate::repositories::room_repo::is_unique_violation(&e) {
                return AppError::AlreadyExists(format!(
                    "Visit for booking {}",
                    entity.booking_id
                ));
            }
            error!("Database error creating visit: {}", e);
            AppError::Database(format!("Failed to create visit: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &GuestVisit) -> AppResult<GuestVisit> {
        debug!("Updating visit: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, VisitRow>(&format!(
            r#"
            UPDATE guest_visits
            SET checkout_at = $2,
                base_amount = $3,
                services_amount = $4,
                total_amount = $5
            WHERE id = $1
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.checkout_at)
        .bind(entity.base_amount)
        .bind(entity.services_amount)
        .bind(entity.total_amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating visit {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update visit: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting visit: {}", id);

        let result = sqlx::query("DELETE FROM guest_visits WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting visit {}: {}", id, e);
                AppError::Database(format!("Failed to delete visit: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VisitRepository for PgVisitRepository {
    #[instrument(skip(self))]
    async fn find_by_booking(&self, booking_id: i32) -> AppResult<Option<GuestVisit>> {
        let result = sqlx::query_as::<sqlx::Postgres, VisitRow>(&format!(
            "SELECT {VISIT_COLUMNS} FROM guest_visits WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding visit by booking: {}", e);
            AppError::Database(format!("Failed to find visit: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_guest(&self, guest_id: i32) -> AppResult<Vec<GuestVisit>> {
        let rows = sqlx::query_as::<sqlx::Postgres, VisitRow>(&format!(
            r#"
            SELECT {VISIT_COLUMNS}
            FROM guest_visits
            WHERE guest_id = $1
            ORDER BY checkin_at DESC
            "#
        ))
        .bind(guest_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding visits by guest: {}", e);
            AppError::Database(format!("Failed to find visits: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_open(&self) -> AppResult<Vec<GuestVisit>> {
        let rows = sqlx::query_as::<sqlx::Postgres, VisitRow>(&format!(
            r#"
            SELECT {VISIT_COLUMNS}
            FROM guest_visits
            WHERE checkout_at IS NULL
            ORDER BY checkin_at
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding open visits: {}", e);
            AppError::Database(format!("Failed to find open visits: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct GuestRow {
    id: i32,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    email: Option<String>,
    doc_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GuestRow> for Guest {
    fn from(row: GuestRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            email: row.email,
            doc_number: row.doc_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct VisitRow {
    id: i32,
    guest_id: i32,
    booking_id: i32,
    room_id: Option<i32>,
    checkin_at: DateTime<Utc>,
    checkout_at: Option<DateTime<Utc>>,
    base_amount: Decimal,
    services_amount: Decimal,
    total_amount: Decimal,
}

impl From<VisitRow> for GuestVisit {
    fn from(row: VisitRow) -> Self {
        Self {
            id: row.id,
            guest_id: row.guest_id,
            booking_id: row.booking_id,
            room_id: row.room_id,
            checkin_at: row.checkin_at,
            checkout_at: row.checkout_at,
            base_amount: row.base_amount,
            services_amount: row.services_amount,
            total_amount: row.total_amount,
        }
    }
}
