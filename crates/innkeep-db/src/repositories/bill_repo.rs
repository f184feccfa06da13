//! Bill and payment repository implementations
//!
//! Bill line items are stored as a JSONB array so positional edits map
//! directly onto the in-memory `Vec<BillItem>`. Payments are append-only
//! rows; the bill's `paid_amount` mirrors their signed sum.

use chrono::{DateTime, Utc};
use innkeep_core::{
    models::{Bill, BillItem, BillStatus, Payment, PaymentMethod},
    traits::{BillRepository, PaymentRepository, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, instrument};

const BILL_COLUMNS: &str = "id, guest_name, guest_contact, booking_id, created_by, items, \
     subtotal, tax, discount, total, paid_amount, status, notes, created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, bill_id, amount, method, received_by, reference, notes, created_at";

/// PostgreSQL implementation of BillRepository
pub struct PgBillRepository {
    pool: PgPool,
}

impl PgBillRepository {
    /// Create a new bill repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse bill status from string
    fn parse_status(s: &str) -> BillStatus {
        BillStatus::from_str(s).unwrap_or(BillStatus::Open)
    }

    /// Find a bill inside an open transaction, locking the row
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<Option<Bill>> {
        let result = sqlx::query_as::<sqlx::Postgres, BillRow>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error locking bill {}: {}", id, e);
            AppError::Database(format!("Failed to lock bill: {}", e))
        })?;

        result.map(Bill::try_from).transpose()
    }

    /// Update a bill inside an open transaction
    pub async fn update_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entity: &Bill,
    ) -> AppResult<Bill> {
        let items = serde_json::to_value(&entity.items)
            .map_err(|e| AppError::Serialization(e.to_string()))?;

        let row = sqlx::query_as::<sqlx::Postgres, BillRow>(&format!(
            r#"
            UPDATE bills
            SET guest_name = $2,
                guest_contact = $3,
                items = $4,
                subtotal = $5,
                tax = $6,
                discount = $7,
                total = $8,
                paid_amount = $9,
                status = $10,
                notes = $11,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BILL_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.guest_name)
        .bind(&entity.guest_contact)
        .bind(items)
        .bind(entity.subtotal)
        .bind(entity.tax)
        .bind(entity.discount)
        .bind(entity.total)
        .bind(entity.paid_amount)
        .bind(entity.status.to_string())
        .bind(&entity.notes)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error updating bill {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update bill: {}", e))
        })?;

        Bill::try_from(row)
    }

    /// Insert a bill inside an open transaction
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entity: &Bill,
    ) -> AppResult<Bill> {
        let items = serde_json::to_value(&entity.items)
            .map_err(|e| AppError::Serialization(e.to_string()))?;

        let row = sqlx::query_as::<sqlx::Postgres, BillRow>(&format!(
            r#"
            INSERT INTO bills (guest_name, guest_contact, booking_id, created_by, items,
                               subtotal, tax, discount, total, paid_amount, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {BILL_COLUMNS}
            "#
        ))
        .bind(&entity.guest_name)
        .bind(&entity.guest_contact)
        .bind(entity.booking_id)
        .bind(entity.created_by)
        .bind(items)
        .bind(entity.subtotal)
        .bind(entity.tax)
        .bind(entity.discount)
        .bind(entity.total)
        .bind(entity.paid_amount)
        .bind(entity.status.to_string())
        .bind(&entity.notes)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error creating bill: {}", e);
            AppError::Database(format!("Failed to create bill: {}", e))
        })?;

        Bill::try_from(row)
    }
}

#[async_trait]
impl Repository<Bill, i32> for PgBillRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Bill>> {
        debug!("Finding bill by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, BillRow>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding bill {}: {}", id, e);
            AppError::Database(format!("Failed to find bill: {}", e))
        })?;

        result.map(Bill::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Bill>> {
        let rows = sqlx::query_as::<sqlx::Postgres, BillRow>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding bills: {}", e);
            AppError::Database(format!("Failed to fetch bills: {}", e))
        })?;

        rows.into_iter().map(Bill::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bills")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting bills: {}", e);
                AppError::Database(format!("Failed to count bills: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Bill) -> AppResult<Bill> {
        debug!("Creating bill for {}", entity.guest_name);

        let items = serde_json::to_value(&entity.items)
            .map_err(|e| AppError::Serialization(e.to_string()))?;

        let row = sqlx::query_as::<sqlx::Postgres, BillRow>(&format!(
            r#"
            INSERT INTO bills (guest_name, guest_contact, booking_id, created_by, items,
                               subtotal, tax, discount, total, paid_amount, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {BILL_COLUMNS}
            "#
        ))
        .bind(&entity.guest_name)
        .bind(&entity.guest_contact)
        .bind(entity.booking_id)
        .bind(entity.created_by)
        .bind(items)
        .bind(entity.subtotal)
        .bind(entity.tax)
        .bind(entity.discount)
        .bind(entity.total)
        .bind(entity.paid_amount)
        .bind(entity.status.to_string())
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating bill: {}", e);
            AppError::Database(format!("Failed to create bill: {}", e))
        })?;

        Bill::try_from(row)
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Bill) -> AppResult<Bill> {
        debug!("Updating bill: {}", entity.id);

        let items = serde_json::to_value(&entity.items)
            .map_err(|e| AppError::Serialization(e.to_string()))?;

        let row = sqlx::query_as::<sqlx::Postgres, BillRow>(&format!(
            r#"
            UPDATE bills
            SET guest_name = $2,
                guest_contact = $3,
                items = $4,
                subtotal = $5,
                tax = $6,
                discount = $7,
                total = $8,
                paid_amount = $9,
                status = $10,
                notes = $11,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BILL_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.guest_name)
        .bind(&entity.guest_contact)
        .bind(items)
        .bind(entity.subtotal)
        .bind(entity.tax)
        .bind(entity.discount)
        .bind(entity.total)
        .bind(entity.paid_amount)
        .bind(entity.status.to_string())
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating bill {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update bill: {}", e))
        })?;

        Bill::try_from(row)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting bill: {}", id);

        let result = sqlx::query("DELETE FROM bills WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting bill {}: {}", id, e);
                AppError::Database(format!("Failed to delete bill: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BillRepository for PgBillRepository {
    #[instrument(skip(self))]
    async fn find_by_booking(&self, booking_id: i32) -> AppResult<Option<Bill>> {
        let result = sqlx::query_as::<sqlx::Postgres, BillRow>(&format!(
            r#"
            SELECT {BILL_COLUMNS}
            FROM bills
            WHERE booking_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding bill by booking: {}", e);
            AppError::Database(format!("Failed to find bill: {}", e))
        })?;

        result.map(Bill::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_filtered(
        &self,
        status: Option<&str>,
        created_by: Option<i32>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Bill>, i64)> {
        let rows = sqlx::query_as::<sqlx::Postgres, BillRow>(&format!(
            r#"
            SELECT {BILL_COLUMNS}
            FROM bills
            WHERE ($1::text IS NULL OR status = $1)
                AND ($2::int IS NULL OR created_by = $2)
                AND ($3::timestamptz IS NULL OR created_at >= $3)
                AND ($4::timestamptz IS NULL OR created_at < $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(status)
        .bind(created_by)
        .bind(from)
        .bind(to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing bills: {}", e);
            AppError::Database(format!("Failed to list bills: {}", e))
        })?;

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM bills
            WHERE ($1::text IS NULL OR status = $1)
                AND ($2::int IS NULL OR created_by = $2)
                AND ($3::timestamptz IS NULL OR created_at >= $3)
                AND ($4::timestamptz IS NULL OR created_at < $4)
            "#,
        )
        .bind(status)
        .bind(created_by)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting filtered bills: {}", e);
            AppError::Database(format!("Failed to count bills: {}", e))
        })?;

        let bills = rows
            .into_iter()
            .map(Bill::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((bills, total.0))
    }
}

/// PostgreSQL implementation of PaymentRepository
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    /// Create a new payment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse payment method from string
    fn parse_method(s: &str) -> PaymentMethod {
        PaymentMethod::from_str(s).unwrap_or(PaymentMethod::Cash)
    }

    /// Insert a payment inside an open transaction, so the payment row and
    /// the bill's updated totals commit together.
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entity: &Payment,
    ) -> AppResult<Payment> {
        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            r#"
            INSERT INTO payments (bill_id, amount, method, received_by, reference, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(entity.bill_id)
        .bind(entity.amount)
        .bind(entity.method.to_string())
        .bind(entity.received_by)
        .bind(&entity.reference)
        .bind(&entity.notes)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error creating payment: {}", e);
            AppError::Database(format!("Failed to create payment: {}", e))
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl Repository<Payment, i32> for PgPaymentRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Payment>> {
        debug!("Finding payment by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding payment {}: {}", id, e);
            AppError::Database(format!("Failed to find payment: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Payment>> {
        let rows = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding payments: {}", e);
            AppError::Database(format!("Failed to fetch payments: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting payments: {}", e);
                AppError::Database(format!("Failed to count payments: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Payment) -> AppResult<Payment> {
        debug!("Recording payment against bill {}", entity.bill_id);

        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            r#"
            INSERT INTO payments (bill_id, amount, method, received_by, reference, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(entity.bill_id)
        .bind(entity.amount)
        .bind(entity.method.to_string())
        .bind(entity.received_by)
        .bind(&entity.reference)
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating payment: {}", e);
            AppError::Database(format!("Failed to create payment: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Payment) -> AppResult<Payment> {
        // Payments are append-only; only the annotations may change.
        debug!("Updating payment: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            r#"
            UPDATE payments
            SET reference = $2,
                notes = $3
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.reference)
        .bind(&entity.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating payment {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update payment: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting payment: {}", id);

        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting payment {}: {}", id, e);
                AppError::Database(format!("Failed to delete payment: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    #[instrument(skip(self))]
    async fn find_by_bill(&self, bill_id: i32) -> AppResult<Vec<Payment>> {
        let rows = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE bill_id = $1 ORDER BY created_at"
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding payments for bill {}: {}", bill_id, e);
            AppError::Database(format!("Failed to fetch payments: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct BillRow {
    id: i32,
    guest_name: String,
    guest_contact: String,
    booking_id: Option<i32>,
    created_by: i32,
    items: serde_json::Value,
    subtotal: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    paid_amount: Decimal,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BillRow> for Bill {
    type Error = AppError;

    fn try_from(row: BillRow) -> Result<Self, Self::Error> {
        let items: Vec<BillItem> = serde_json::from_value(row.items)
            .map_err(|e| AppError::Serialization(format!("Invalid bill items: {}", e)))?;

        Ok(Self {
            id: row.id,
            guest_name: row.guest_name,
            guest_contact: row.guest_contact,
            booking_id: row.booking_id,
            created_by: row.created_by,
            items,
            subtotal: row.subtotal,
            tax: row.tax,
            discount: row.discount,
            total: row.total,
            paid_amount: row.paid_amount,
            status: PgBillRepository::parse_status(&row.status),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i32,
    bill_id: i32,
    amount: Decimal,
    method: String,
    received_by: i32,
    reference: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            bill_id: row.bill_id,
            amount: row.amount,
            method: PgPaymentRepository::parse_method(&row.method),
            received_by: row.received_by,
            reference: row.reference,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(PgBillRepository::parse_status("paid"), BillStatus::Paid);
        assert_eq!(
            PgBillRepository::parse_status("partially_paid"),
            BillStatus::PartiallyPaid
        );
        // unknown statuses fall back to open
        assert_eq!(PgBillRepository::parse_status("weird"), BillStatus::Open);
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(PgPaymentRepository::parse_method("card"), PaymentMethod::Card);
        assert_eq!(
            PgPaymentRepository::parse_method("refund"),
            PaymentMethod::Refund
        );
        assert_eq!(PgPaymentRepository::parse_method("iou"), PaymentMethod::Cash);
    }
}
