//! Report handlers
//!
//! HTTP handlers for management reports. Access is gated on the acting
//! staff member's role inside the reporting service.

use crate::dto::ApiResponse;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use innkeep_core::AppError;
use innkeep_db::PgStaffRepository;
use innkeep_services::ReportingService;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

/// Period report query
#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub staff_id: i32,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

fn reporting(pool: &PgPool) -> ReportingService<PgStaffRepository> {
    ReportingService::new(
        Arc::new(PgStaffRepository::new(pool.clone())),
        Arc::new(pool.clone()),
    )
}

/// Period report: bookings by status, revenue, payments, refunds, bills
///
/// GET /api/v1/reports/period
#[instrument(skip(pool))]
pub async fn period_report(
    pool: web::Data<PgPool>,
    query: web::Query<PeriodParams>,
) -> Result<HttpResponse, AppError> {
    let service = reporting(pool.get_ref());
    let report = service
        .period_report(query.staff_id, query.from, query.to)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

/// Configure report routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/reports").route("/period", web::get().to(period_report)));
}
