//! Guest handlers
//!
//! HTTP handlers for the guest registry.

use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use innkeep_core::models::Guest;
use innkeep_core::AppError;
use innkeep_db::{PgBookingRepository, PgGuestRepository, PgVisitRepository};
use innkeep_services::FrontDesk;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{instrument, warn};
use validator::Validate;

/// Guest response DTO
#[derive(Debug, Serialize)]
pub struct GuestResponse {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub doc_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Guest> for GuestResponse {
    fn from(g: Guest) -> Self {
        Self {
            id: g.id,
            full_name: g.full_name(),
            first_name: g.first_name,
            last_name: g.last_name,
            phone: g.phone,
            email: g.email,
            doc_number: g.doc_number,
            created_at: g.created_at,
        }
    }
}

/// Request to register a guest
#[derive(Debug, Deserialize, Validate)]
pub struct GuestCreateRequest {
    #[validate(length(min = 1, max = 120))]
    pub first_name: String,
    #[validate(length(min = 1, max = 120))]
    pub last_name: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub doc_number: Option<String>,
}

/// Request to update a guest
#[derive(Debug, Deserialize)]
pub struct GuestUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub doc_number: Option<String>,
}

/// Guest search parameters
#[derive(Debug, Deserialize)]
pub struct GuestSearchParams {
    pub q: Option<String>,
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

/// List or search guests
///
/// GET /api/v1/guests
#[instrument(skip(pool))]
pub async fn list_guests(
    pool: web::Data<PgPool>,
    query: web::Query<PaginationParams>,
    search: web::Query<GuestSearchParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let desk = front_desk(pool.get_ref());
    let (guests, total) = desk
        .search_guests(
            search.q.as_deref().unwrap_or(""),
            query.limit(),
            query.offset(),
        )
        .await?;

    let data: Vec<GuestResponse> = guests.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Register a guest
///
/// POST /api/v1/guests
#[instrument(skip(pool, req))]
pub async fn create_guest(
    pool: web::Data<PgPool>,
    req: web::Json<GuestCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Guest validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let desk = front_desk(pool.get_ref());
    let guest = desk
        .register_guest(
            req.first_name.clone(),
            req.last_name.clone(),
            req.phone.clone(),
            req.email.clone(),
            req.doc_number.clone(),
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        GuestResponse::from(guest),
        "Guest registered",
    )))
}

/// Get one guest
///
/// GET /api/v1/guests/{id}
#[instrument(skip(pool))]
pub async fn get_guest(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = front_desk(pool.get_ref());
    let guest = desk.get_guest(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(GuestResponse::from(guest))))
}

/// Update a guest
///
/// PATCH /api/v1/guests/{id}
#[instrument(skip(pool, req))]
pub async fn update_guest(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
    req: web::Json<GuestUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let desk = front_desk(pool.get_ref());
    let guest = desk
        .update_guest(
            path.into_inner(),
            req.first_name.clone(),
            req.last_name.clone(),
            req.phone.clone(),
            req.email.clone(),
            req.doc_number.clone(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(GuestResponse::from(guest))))
}

/// Delete a guest
///
/// DELETE /api/v1/guests/{id}
#[instrument(skip(pool))]
pub async fn delete_guest(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = front_desk(pool.get_ref());
    desk.remove_guest(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Visit history of a guest
///
/// GET /api/v1/guests/{id}/visits
#[instrument(skip(pool))]
pub async fn guest_visits(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = front_desk(pool.get_ref());
    let visits = desk.guest_visits(path.into_inner()).await?;
    let data: Vec<crate::handlers::stays::VisitResponse> =
        visits.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Configure guest routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/guests")
            .route("", web::get().to(list_guests))
            .route("", web::post().to(create_guest))
            .route("/{id}", web::get().to(get_guest))
            .route("/{id}", web::patch().to(update_guest))
            .route("/{id}", web::delete().to(delete_guest))
            .route("/{id}/visits", web::get().to(guest_visits)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let valid = GuestCreateRequest {
            first_name: "Anna".to_string(),
            last_name: "Koval".to_string(),
            phone: None,
            email: Some("anna@example.com".to_string()),
            doc_number: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = GuestCreateRequest {
            first_name: "".to_string(),
            email: Some("nope".to_string()),
            ..valid
        };
        assert!(invalid.validate().is_err());
    }
}
