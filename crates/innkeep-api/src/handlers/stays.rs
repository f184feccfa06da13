//! Stay handlers
//!
//! HTTP handlers for the check-in/check-out flow and visit lookups.

use crate::dto::ApiResponse;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::models::GuestVisit;
use innkeep_core::AppError;
use innkeep_db::{PgBookingRepository, PgGuestRepository, PgVisitRepository};
use innkeep_services::FrontDesk;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{instrument, warn};
use validator::Validate;

/// Visit response DTO
#[derive(Debug, Serialize)]
pub struct VisitResponse {
    pub id: i32,
    pub guest_id: i32,
    pub booking_id: i32,
    pub room_id: Option<i32>,
    pub checkin_at: DateTime<Utc>,
    pub checkout_at: Option<DateTime<Utc>>,
    pub base_amount: Decimal,
    pub services_amount: Decimal,
    pub total_amount: Decimal,
    pub is_open: bool,
}

impl From<GuestVisit> for VisitResponse {
    fn from(v: GuestVisit) -> Self {
        Self {
            id: v.id,
            guest_id: v.guest_id,
            booking_id: v.booking_id,
            room_id: v.room_id,
            checkin_at: v.checkin_at,
            checkout_at: v.checkout_at,
            base_amount: v.base_amount,
            services_amount: v.services_amount,
            total_amount: v.total_amount,
            is_open: v.checkout_at.is_none(),
        }
    }
}

/// Request to check a guest in
#[derive(Debug, Deserialize, Validate)]
pub struct CheckInRequest {
    pub booking_id: i32,
    pub guest_id: i32,
    /// Override for the business date; defaults to today
    pub date: Option<NaiveDate>,
}

/// Request to check a booking out
#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    pub booking_id: i32,
}

fn front_desk(
    pool: &PgPool,
) -> FrontDesk<PgGuestRepository, PgVisitRepository, PgBookingRepository> {
    FrontDesk::new(
        Arc::new(PgGuestRepository::new(pool.clone())),
        Arc::new(PgVisitRepository::new(pool.clone())),
        Arc::new(PgBookingRepository::new(pool.clone())),
        Arc::new(pool.clone()),
    )
}

/// Check a guest in against a confirmed booking
///
/// POST /api/v1/stays/check-in
#[instrument(skip(pool, req))]
pub async fn check_in(
    pool: web::Data<PgPool>,
    req: web::Json<CheckInRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Check-in validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let today = req.date.unwrap_or_else(|| Utc::now().date_naive());
    let desk = front_desk(pool.get_ref());
    let (_, visit) = desk.check_in(req.booking_id, req.guest_id, today).await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        VisitResponse::from(visit),
        "Guest checked in",
    )))
}

/// Check a booking out, closing its visit
///
/// POST /api/v1/stays/check-out
#[instrument(skip(pool, req))]
pub async fn check_out(
    pool: web::Data<PgPool>,
    req: web::Json<CheckOutRequest>,
) -> Result<HttpResponse, AppError> {
    let desk = front_desk(pool.get_ref());
    let (_, visit) = desk.check_out(req.booking_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        VisitResponse::from(visit),
        "Guest checked out",
    )))
}

/// Get one visit
///
/// GET /api/v1/stays/{id}
#[instrument(skip(pool))]
pub async fn get_visit(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = front_desk(pool.get_ref());
    let visit = desk.get_visit(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(VisitResponse::from(visit))))
}

/// Visits currently open (guests in house)
///
/// GET /api/v1/stays/open
#[instrument(skip(pool))]
pub async fn open_visits(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let desk = front_desk(pool.get_ref());
    let visits = desk.open_visits().await?;
    let data: Vec<VisitResponse> = visits.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Configure stay routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stays")
            .route("/check-in", web::post().to(check_in))
            .route("/check-out", web::post().to(check_out))
            .route("/open", web::get().to(open_visits))
            .route("/{id}", web::get().to(get_visit)),
    );
}
