//! Room handlers
//!
//! HTTP handlers for the room inventory and availability search.

use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use innkeep_core::models::{Room, RoomType};
use innkeep_core::AppError;
use innkeep_db::{PgBookingRepository, PgRoomRepository};
use innkeep_services::BookingDesk;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use validator::Validate;

/// Room response DTO
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub id: i32,
    pub number: String,
    pub room_type: String,
    pub floor: i32,
    pub capacity: i32,
    pub price_per_night: Decimal,
    pub description: Option<String>,
    pub is_available: bool,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        Self {
            id: room.id,
            number: room.number,
            room_type: room.room_type.code().to_string(),
            floor: room.floor,
            capacity: room.capacity,
            price_per_night: room.price_per_night,
            description: room.description,
            is_available: room.is_available,
        }
    }
}

/// Request to register a room
#[derive(Debug, Deserialize, Validate)]
pub struct RoomCreateRequest {
    #[validate(length(min = 1, max = 16))]
    pub number: String,
    pub room_type: String,
    pub floor: i32,
    #[validate(range(min = 1))]
    pub capacity: i32,
    pub description: Option<String>,
}

/// Request to update a room
#[derive(Debug, Deserialize)]
pub struct RoomUpdateRequest {
    pub room_type: Option<String>,
    pub floor: Option<i32>,
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub is_available: Option<bool>,
}

/// Room list filters
#[derive(Debug, Deserialize)]
pub struct RoomFilterParams {
    pub room_type: Option<String>,
    pub floor: Option<i32>,
    pub min_capacity: Option<i32>,
}

/// Availability search parameters
#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_type: Option<String>,
    pub min_capacity: Option<i32>,
}

fn booking_desk(pool: &PgPool) -> BookingDesk<PgRoomRepository, PgBookingRepository> {
    BookingDesk::new(
        Arc::new(PgRoomRepository::new(pool.clone())),
        Arc::new(PgBookingRepository::new(pool.clone())),
        Arc::new(pool.clone()),
    )
}

fn parse_room_type(s: &str) -> Result<RoomType, AppError> {
    RoomType::from_str(s)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown room type: {}", s)))
}

/// List rooms with pagination and filters
///
/// GET /api/v1/rooms
#[instrument(skip(pool))]
pub async fn list_rooms(
    pool: web::Data<PgPool>,
    query: web::Query<PaginationParams>,
    filters: web::Query<RoomFilterParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let desk = booking_desk(pool.get_ref());
    let (rooms, total) = desk
        .list_rooms(
            filters.room_type.as_deref(),
            filters.floor,
            filters.min_capacity,
            query.limit(),
            query.offset(),
        )
        .await?;

    let data: Vec<RoomResponse> = rooms.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Rooms free for a date range
///
/// GET /api/v1/rooms/available
#[instrument(skip(pool))]
pub async fn search_available(
    pool: web::Data<PgPool>,
    query: web::Query<AvailabilityParams>,
) -> Result<HttpResponse, AppError> {
    debug!(
        "Availability search {} to {}",
        query.check_in, query.check_out
    );

    let desk = booking_desk(pool.get_ref());
    let rooms = desk
        .search_available_rooms(
            query.check_in,
            query.check_out,
            query.room_type.as_deref(),
            query.min_capacity,
        )
        .await?;

    let data: Vec<RoomResponse> = rooms.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Register a new room
///
/// POST /api/v1/rooms
#[instrument(skip(pool, req))]
pub async fn create_room(
    pool: web::Data<PgPool>,
    req: web::Json<RoomCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Room validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let room_type = parse_room_type(&req.room_type)?;
    let desk = booking_desk(pool.get_ref());

    let room = desk
        .add_room(
            req.number.clone(),
            room_type,
            req.floor,
            req.capacity,
            req.description.clone(),
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        RoomResponse::from(room),
        "Room registered",
    )))
}

/// Get one room
///
/// GET /api/v1/rooms/{id}
#[instrument(skip(pool))]
pub async fn get_room(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = booking_desk(pool.get_ref());
    let room = desk.get_room(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(RoomResponse::from(room))))
}

/// Update a room
///
/// PATCH /api/v1/rooms/{id}
#[instrument(skip(pool, req))]
pub async fn update_room(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
    req: web::Json<RoomUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let room_type = req
        .room_type
        .as_deref()
        .map(parse_room_type)
        .transpose()?;

    let desk = booking_desk(pool.get_ref());
    let room = desk
        .update_room(
            path.into_inner(),
            room_type,
            req.floor,
            req.capacity,
            req.description.clone(),
            req.is_available,
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(RoomResponse::from(room))))
}

/// Delete a room
///
/// DELETE /api/v1/rooms/{id}
#[instrument(skip(pool))]
pub async fn delete_room(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = booking_desk(pool.get_ref());
    desk.remove_room(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Configure room routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rooms")
            .route("", web::get().to(list_rooms))
            .route("", web::post().to(create_room))
            .route("/available", web::get().to(search_available))
            .route("/{id}", web::get().to(get_room))
            .route("/{id}", web::patch().to(update_room))
            .route("/{id}", web::delete().to(delete_room)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let valid = RoomCreateRequest {
            number: "101".to_string(),
            room_type: "standard".to_string(),
            floor: 1,
            capacity: 2,
            description: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = RoomCreateRequest {
            number: "".to_string(),
            room_type: "standard".to_string(),
            floor: 1,
            capacity: 0,
            description: None,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_parse_room_type() {
        assert!(parse_room_type("deluxe").is_ok());
        assert!(parse_room_type("penthouse").is_err());
    }
}
