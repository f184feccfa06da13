//! Reporting service
//!
//! Aggregates the period figures managers look at: bookings by status,
//! revenue collected, refunds given, occupancy. Reports are manager-only.

use chrono::{DateTime, Utc};
use innkeep_core::{
    traits::{Repository, StaffRepository},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument, warn};

/// Period report for managers
#[derive(Debug, Clone, Serialize)]
pub struct PeriodReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Bookings created in the period
    pub bookings_total: i64,
    /// Same bookings, by status
    pub bookings_by_status: Vec<StatusCount>,
    /// Visits closed in the period
    pub visits_closed: i64,
    /// Sum of closed visits' totals (lodging plus services)
    pub visit_revenue: Decimal,
    /// Payments recorded in the period, refunds included
    pub payments_count: i64,
    /// Signed sum of payments in the period (refunds subtract)
    pub payments_net: Decimal,
    /// Refunds given in the period, as a positive number
    pub refunds_total: Decimal,
    /// Net payment amounts by method
    pub payments_by_method: Vec<MethodAmount>,
    /// Bills opened in the period
    pub bills_total: i64,
    /// Bills fully paid as of now
    pub bills_paid: i64,
    /// Bills still carrying a balance
    pub bills_outstanding: i64,
    /// Sum of totals over the paid bills
    pub paid_bill_revenue: Decimal,
}

/// Count of bookings in one status
#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Payment count and net amount for one method
#[derive(Debug, Clone, Serialize)]
pub struct MethodAmount {
    pub method: String,
    pub count: i64,
    pub amount: Decimal,
}

/// Reporting service
pub struct ReportingService<S: StaffRepository> {
    staff_repo: Arc<S>,
    pool: Arc<PgPool>,
}

impl<S: StaffRepository> ReportingService<S> {
    /// Create a new reporting service
    pub fn new(staff_repo: Arc<S>, pool: Arc<PgPool>) -> Self {
        Self { staff_repo, pool }
    }

    /// Build the period report. Fails unless the actor is an active manager.
    #[instrument(skip(self))]
    pub async fn period_report(
        &self,
        acting_staff_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<PeriodReport> {
        let actor = self
            .staff_repo
            .find_by_id(acting_staff_id)
            .await?
            .ok_or(AppError::StaffNotFound(acting_staff_id))?;

        if !actor.is_active || !actor.role.can_view_reports() {
            warn!("Staff {} denied report access", acting_staff_id);
            return Err(AppError::Forbidden(format!(
                "Staff member {} may not view reports",
                acting_staff_id
            )));
        }

        if to <= from {
            return Err(AppError::InvalidInput(
                "report period end must be after its start".to_string(),
            ));
        }

        let bookings_by_status: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM bookings
            WHERE created_at >= $1 AND created_at < $2
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| {
            error!("Database error aggregating bookings: {}", e);
            AppError::Database(format!("Failed to aggregate bookings: {}", e))
        })?;

        let visits: (i64, Option<Decimal>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), SUM(total_amount)
            FROM guest_visits
            WHERE checkout_at >= $1 AND checkout_at < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            error!("Database error aggregating visits: {}", e);
            AppError::Database(format!("Failed to aggregate visits: {}", e))
        })?;

        let payments: (i64, Option<Decimal>, Option<Decimal>) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   SUM(amount),
                   SUM(CASE WHEN amount < 0 THEN -amount ELSE 0 END)
            FROM payments
            WHERE created_at >= $1 AND created_at < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            error!("Database error aggregating payments: {}", e);
            AppError::Database(format!("Failed to aggregate payments: {}", e))
        })?;

        let by_method: Vec<(String, i64, Option<Decimal>)> = sqlx::query_as(
            r#"
            SELECT method, COUNT(*), SUM(amount)
            FROM payments
            WHERE created_at >= $1 AND created_at < $2
            GROUP BY method
            ORDER BY method
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| {
            error!("Database error aggregating payments by method: {}", e);
            AppError::Database(format!("Failed to aggregate payments: {}", e))
        })?;

        let bills: (i64, i64, i64, Option<Decimal>) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'paid'),
                   COUNT(*) FILTER (WHERE status IN ('open', 'partially_paid')),
                   SUM(total) FILTER (WHERE status = 'paid')
            FROM bills
            WHERE created_at >= $1 AND created_at < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            error!("Database error aggregating bills: {}", e);
            AppError::Database(format!("Failed to aggregate bills: {}", e))
        })?;

        Ok(PeriodReport {
            from,
            to,
            bookings_total: bookings_by_status.iter().map(|(_, c)| c).sum(),
            bookings_by_status: bookings_by_status
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            visits_closed: visits.0,
            visit_revenue: visits.1.unwrap_or(Decimal::ZERO),
            payments_count: payments.0,
            payments_net: payments.1.unwrap_or(Decimal::ZERO),
            refunds_total: payments.2.unwrap_or(Decimal::ZERO),
            payments_by_method: by_method
                .into_iter()
                .map(|(method, count, amount)| MethodAmount {
                    method,
                    count,
                    amount: amount.unwrap_or(Decimal::ZERO),
                })
                .collect(),
            bills_total: bills.0,
            bills_paid: bills.1,
            bills_outstanding: bills.2,
            paid_bill_revenue: bills.3.unwrap_or(Decimal::ZERO),
        })
    }
}
