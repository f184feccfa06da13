//! Staff repository implementation
//!
//! Staff rows are soft-deactivated rather than deleted; bills and payments
//! keep RESTRICT foreign keys to them, so hard deletes fail once a member
//! has recorded anything.

use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    models::{Staff, StaffRole},
    traits::{Repository, StaffRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error, instrument};

const STAFF_COLUMNS: &str =
    "id, full_name, email, phone, role, hire_date, termination_date, is_active, notes, created_at, updated_at";

/// PostgreSQL implementation of StaffRepository
pub struct PgStaffRepository {
    pool: PgPool,
}

impl PgStaffRepository {
    /// Create a new staff repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse role from string
    fn parse_role(s: &str) -> StaffRole {
        StaffRole::from_str(s).unwrap_or(StaffRole::Staff)
    }
}

#[async_trait]
impl Repository<Staff, i32> for PgStaffRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Staff>> {
        debug!("Finding staff by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, StaffRow>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding staff {}: {}", id, e);
            AppError::Database(format!("Failed to find staff member: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Staff>> {
        let rows = sqlx::query_as::<sqlx::Postgres, StaffRow>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff ORDER BY full_name LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding staff: {}", e);
            AppError::Database(format!("Failed to fetch staff: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM staff")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting staff: {}", e);
                AppError::Database(format!("Failed to count staff: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Staff) -> AppResult<Staff> {
        debug!("Creating staff member: {}", entity.email);

        let row = sqlx::query_as::<sqlx::Postgres, StaffRow>(&format!(
            r#"
            INSERT INTO staff (full_name, email, phone, role, hire_date, is_active, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {STAFF_COLUMNS}
            "#
        ))
        .bind(&entity.full_name)
        .bind(&entity.email)
        .bind(&entity.phone)
        .bind(entity.role.to_string())
        .bind(entity.hire_date)
        .bind(entity.is_active)
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if crate::repositories::room_repo::is_unique_violation(&e) {
                return AppError::AlreadyExists(format!("Staff email {}", entity.email));
            }
            error!("Database error creating staff member: {}", e);
            AppError::Database(format!("Failed to create staff member: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Staff) -> AppResult<Staff> {
        debug!("Updating staff member: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, StaffRow>(&format!(
            r#"
            UPDATE staff
            SET full_name = $2,
                email = $3,
                phone = $4,
                role = $5,
                hire_date = $6,
                termination_date = $7,
                is_active = $8,
                notes = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {STAFF_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.full_name)
        .bind(&entity.email)
        .bind(&entity.phone)
        .bind(entity.role.to_string())
        .bind(entity.hire_date)
        .bind(entity.termination_date)
        .bind(entity.is_active)
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating staff {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update staff member: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting staff member: {}", id);

        let result = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting staff {}: {}", id, e);
                AppError::Database(format!("Failed to delete staff member: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl StaffRepository for PgStaffRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Staff>> {
        let result = sqlx::query_as::<sqlx::Postgres, StaffRow>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding staff by email: {}", e);
            AppError::Database(format!("Failed to find staff member: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_active(&self, role: Option<&str>) -> AppResult<Vec<Staff>> {
        let rows = sqlx::query_as::<sqlx::Postgres, StaffRow>(&format!(
            r#"
            SELECT {STAFF_COLUMNS}
            FROM staff
            WHERE is_active = TRUE
                AND ($1::text IS NULL OR role = $1)
            ORDER BY full_name
            "#
        ))
        .bind(role)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding active staff: {}", e);
            AppError::Database(format!("Failed to fetch active staff: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct StaffRow {
    id: i32,
    full_name: String,
    email: String,
    phone: Option<String>,
    role: String,
    hire_date: NaiveDate,
    termination_date: Option<NaiveDate>,
    is_active: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StaffRow> for Staff {
    fn from(row: StaffRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            role: PgStaffRepository::parse_role(&row.role),
            hire_date: row.hire_date,
            termination_date: row.termination_date,
            is_active: row.is_active,
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
    fn test_parse_role() {
        assert_eq!(
            PgStaffRepository::parse_role("manager"),
            StaffRole::Manager
        );
        assert_eq!(
            PgStaffRepository::parse_role("receptionist"),
            StaffRole::Receptionist
        );
        // unknown roles fall back to the least privileged
        assert_eq!(PgStaffRepository::parse_role("owner"), StaffRole::Staff);
    }
}
