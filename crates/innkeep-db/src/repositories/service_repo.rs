//! Service price list and service order repository implementations

use chrono::{DateTime, Utc};
use innkeep_core::{
    models::{Service, ServiceOrder, ServiceOrderStatus},
    traits::{Repository, ServiceOrderRepository, ServiceRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, instrument};

const SERVICE_COLUMNS: &str = "id, code, title, base_price, is_active, created_at";

const ORDER_COLUMNS: &str =
    "id, visit_id, service_id, quantity, unit_price, status, note, created_at";

/// PostgreSQL implementation of ServiceRepository
pub struct PgServiceRepository {
    pool: PgPool,
}

impl PgServiceRepository {
    /// Create a new service repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Service, i32> for PgServiceRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Service>> {
        debug!("Finding service by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding service {}: {}", id, e);
            AppError::Database(format!("Failed to find service: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Service>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services ORDER BY code LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding services: {}", e);
            AppError::Database(format!("Failed to fetch services: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM services")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting services: {}", e);
                AppError::Database(format!("Failed to count services: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Service) -> AppResult<Service> {
        debug!("Creating service: {}", entity.code);

        let row = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            r#"
            INSERT INTO services (code, title, base_price, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING {SERVICE_COLUMNS}
            "#
        ))
        .bind(&entity.code)
        .bind(&entity.title)
        .bind(entity.base_price)
        .bind(entity.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if crate::repositories::room_repo::is_unique_violation(&e) {
                return AppError::AlreadyExists(format!("Service code {}", entity.code));
            }
            error!("Database error creating service: {}", e);
            AppError::Database(format!("Failed to create service: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Service) -> AppResult<Service> {
        debug!("Updating service: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            r#"
            UPDATE services
            SET code = $2,
                title = $3,
                base_price = $4,
                is_active = $5
            WHERE id = $1
            RETURNING {SERVICE_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.code)
        .bind(&entity.title)
        .bind(entity.base_price)
        .bind(entity.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating service {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update service: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting service: {}", id);

        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting service {}: {}", id, e);
                AppError::Database(format!("Failed to delete service: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ServiceRepository for PgServiceRepository {
    #[instrument(skip(self))]
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Service>> {
        let result = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE code = $1"
        ))
        .bind(code.to_uppercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding service by code: {}", e);
            AppError::Database(format!("Failed to find service: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_active(&self) -> AppResult<Vec<Service>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE is_active = TRUE ORDER BY code"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding active services: {}", e);
            AppError::Database(format!("Failed to fetch active services: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// PostgreSQL implementation of ServiceOrderRepository
pub struct PgServiceOrderRepository {
    pool: PgPool,
}

impl PgServiceOrderRepository {
    /// Create a new service order repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse order status from string
    fn parse_status(s: &str) -> ServiceOrderStatus {
        ServiceOrderStatus::from_str(s).unwrap_or(ServiceOrderStatus::Pending)
    }

    /// Update an order inside an open transaction, used when an order state
    /// change and the owning visit's totals must commit together.
    pub async fn update_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entity: &ServiceOrder,
    ) -> AppResult<ServiceOrder> {
        let row = sqlx::query_as::<sqlx::Postgres, OrderRow>(&format!(
            r#"
            UPDATE service_orders
            SET quantity = $2,
                unit_price = $3,
                status = $4,
                note = $5
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.quantity)
        .bind(entity.unit_price)
        .bind(entity.status.to_string())
        .bind(&entity.note)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error updating service order {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update service order: {}", e))
        })?;

        Ok(row.into())
    }

    /// All orders of a visit, read inside an open transaction
    pub async fn find_by_visit_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        visit_id: i32,
    ) -> AppResult<Vec<ServiceOrder>> {
        let rows = sqlx::query_as::<sqlx::Postgres, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM service_orders WHERE visit_id = $1 ORDER BY id"
        ))
        .bind(visit_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error finding orders for visit {}: {}", visit_id, e);
            AppError::Database(format!("Failed to fetch service orders: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl Repository<ServiceOrder, i32> for PgServiceOrderRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<ServiceOrder>> {
        debug!("Finding service order by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM service_orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding service order {}: {}", id, e);
            AppError::Database(format!("Failed to find service order: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<ServiceOrder>> {
        let rows = sqlx::query_as::<sqlx::Postgres, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM service_orders ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding service orders: {}", e);
            AppError::Database(format!("Failed to fetch service orders: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM service_orders")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting service orders: {}", e);
                AppError::Database(format!("Failed to count service orders: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &ServiceOrder) -> AppResult<ServiceOrder> {
        debug!("Placing service order for visit {}", entity.visit_id);

        let row = sqlx::query_as::<sqlx::Postgres, OrderRow>(&format!(
            r#"
            INSERT INTO service_orders (visit_id, service_id, quantity, unit_price, status, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(entity.visit_id)
        .bind(entity.service_id)
        .bind(entity.quantity)
        .bind(entity.unit_price)
        .bind(entity.status.to_string())
        .bind(&entity.note)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating service order: {}", e);
            AppError::Database(format!("Failed to create service order: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &ServiceOrder) -> AppResult<ServiceOrder> {
        debug!("Updating service order: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, OrderRow>(&format!(
            r#"
            UPDATE service_orders
            SET quantity = $2,
                unit_price = $3,
                status = $4,
                note = $5
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.quantity)
        .bind(entity.unit_price)
        .bind(entity.status.to_string())
        .bind(&entity.note)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating service order {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update service order: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting service order: {}", id);

        let result = sqlx::query("DELETE FROM service_orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting service order {}: {}", id, e);
                AppError::Database(format!("Failed to delete service order: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ServiceOrderRepository for PgServiceOrderRepository {
    #[instrument(skip(self))]
    async fn find_by_visit(&self, visit_id: i32) -> AppResult<Vec<ServiceOrder>> {
        let rows = sqlx::query_as::<sqlx::Postgres, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM service_orders WHERE visit_id = $1 ORDER BY id"
        ))
        .bind(visit_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding orders for visit {}: {}", visit_id, e);
            AppError::Database(format!("Failed to fetch service orders: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: i32,
    code: String,
    title: String,
    base_price: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            title: row.title,
            base_price: row.base_price,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    visit_id: i32,
    service_id: i32,
    quantity: i32,
    unit_price: Decimal,
    status: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for ServiceOrder {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            visit_id: row.visit_id,
            service_id: row.service_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            status: PgServiceOrderRepository::parse_status(&row.status),
            note: row.note,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(
            PgServiceOrderRepository::parse_status("completed"),
            ServiceOrderStatus::Completed
        );
        assert_eq!(
            PgServiceOrderRepository::parse_status("canceled"),
            ServiceOrderStatus::Canceled
        );
        // unknown statuses fall back to pending
        assert_eq!(
            PgServiceOrderRepository::parse_status("lost"),
            ServiceOrderStatus::Pending
        );
    }
}
