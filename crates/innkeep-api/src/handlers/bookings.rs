//! Booking handlers
//!
//! HTTP handlers for the reservation lifecycle up to check-in.

use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::models::{Booking, BookingStatus};
use innkeep_core::AppError;
use innkeep_db::{PgBookingRepository, PgRoomRepository};
use innkeep_services::{booking_desk::NewBooking, BookingDesk};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{instrument, warn};
use validator::Validate;

/// Booking response DTO
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: i32,
    pub room_id: i32,
    pub guest_name: String,
    pub guest_phone: String,
    pub guest_email: Option<String>,
    pub guest_id: Option<i32>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub total_price: Decimal,
    pub status: String,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            room_id: b.room_id,
            nights: b.nights(),
            guest_name: b.guest_name,
            guest_phone: b.guest_phone,
            guest_email: b.guest_email,
            guest_id: b.guest_id,
            check_in: b.check_in,
            check_out: b.check_out,
            total_price: b.total_price,
            status: b.status.to_string(),
            special_requests: b.special_requests,
            created_at: b.created_at,
        }
    }
}

/// Request to create a booking
#[derive(Debug, Deserialize, Validate)]
pub struct BookingCreateRequest {
    pub room_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub guest_name: String,
    #[validate(length(min = 1, max = 32))]
    pub guest_phone: String,
    #[validate(email)]
    pub guest_email: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub special_requests: Option<String>,
}

/// Booking list filters
#[derive(Debug, Deserialize)]
pub struct BookingFilterParams {
    pub room_id: Option<i32>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Arrivals query
#[derive(Debug, Deserialize)]
pub struct ArrivalsParams {
    pub date: Option<NaiveDate>,
}

fn booking_desk(pool: &PgPool) -> BookingDesk<PgRoomRepository, PgBookingRepository> {
    BookingDesk::new(
        Arc::new(PgRoomRepository::new(pool.clone())),
        Arc::new(PgBookingRepository::new(pool.clone())),
        Arc::new(pool.clone()),
    )
}

/// List bookings with pagination and filters
///
/// GET /api/v1/bookings
#[instrument(skip(pool))]
pub async fn list_bookings(
    pool: web::Data<PgPool>,
    query: web::Query<PaginationParams>,
    filters: web::Query<BookingFilterParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let status = filters
        .status
        .as_deref()
        .map(|s| {
            BookingStatus::from_str(s)
                .ok_or_else(|| AppError::InvalidInput(format!("Unknown booking status: {}", s)))
        })
        .transpose()?;

    let desk = booking_desk(pool.get_ref());
    let (bookings, total) = desk
        .list_bookings(
            filters.room_id,
            status,
            filters.from,
            filters.to,
            query.limit(),
            query.offset(),
        )
        .await?;

    let data: Vec<BookingResponse> = bookings.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Confirmed bookings arriving on a date (today by default)
///
/// GET /api/v1/bookings/arrivals
#[instrument(skip(pool))]
pub async fn list_arrivals(
    pool: web::Data<PgPool>,
    query: web::Query<ArrivalsParams>,
) -> Result<HttpResponse, AppError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let desk = booking_desk(pool.get_ref());
    let bookings = desk.arrivals(date).await?;

    let data: Vec<BookingResponse> = bookings.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Create a booking
///
/// POST /api/v1/bookings
#[instrument(skip(pool, req))]
pub async fn create_booking(
    pool: web::Data<PgPool>,
    req: web::Json<BookingCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Booking validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let desk = booking_desk(pool.get_ref());
    let booking = desk
        .create_booking(NewBooking {
            room_id: req.room_id,
            guest_name: req.guest_name.clone(),
            guest_phone: req.guest_phone.clone(),
            guest_email: req.guest_email.clone(),
            check_in: req.check_in,
            check_out: req.check_out,
            special_requests: req.special_requests.clone(),
        })
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        BookingResponse::from(booking),
        "Booking created",
    )))
}

/// Get one booking
///
/// GET /api/v1/bookings/{id}
#[instrument(skip(pool))]
pub async fn get_booking(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = booking_desk(pool.get_ref());
    let booking = desk.get_booking(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(BookingResponse::from(booking))))
}

/// Confirm a pending booking
///
/// POST /api/v1/bookings/{id}/confirm
#[instrument(skip(pool))]
pub async fn confirm_booking(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = booking_desk(pool.get_ref());
    let booking = desk.confirm_booking(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        BookingResponse::from(booking),
        "Booking confirmed",
    )))
}

/// Cancel a booking
///
/// POST /api/v1/bookings/{id}/cancel
#[instrument(skip(pool))]
pub async fn cancel_booking(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = booking_desk(pool.get_ref());
    let booking = desk.cancel_booking(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        BookingResponse::from(booking),
        "Booking cancelled",
    )))
}

/// Configure booking routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::get().to(list_bookings))
            .route("", web::post().to(create_booking))
            .route("/arrivals", web::get().to(list_arrivals))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}/confirm", web::post().to(confirm_booking))
            .route("/{id}/cancel", web::post().to(cancel_booking)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let valid = BookingCreateRequest {
            room_id: 1,
            guest_name: "Anna Koval".to_string(),
            guest_phone: "+7-900-000-00-00".to_string(),
            guest_email: Some("anna@example.com".to_string()),
            check_in: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2026, 9, 4).unwrap(),
            special_requests: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = BookingCreateRequest {
            guest_name: "".to_string(),
            guest_email: Some("not-an-email".to_string()),
            ..valid
        };
        assert!(invalid.validate().is_err());
    }
}
