//! Service handlers
//!
//! HTTP handlers for the price list and per-visit service orders.

use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use innkeep_core::models::{Service, ServiceOrder};
use innkeep_core::AppError;
use innkeep_db::{PgServiceOrderRepository, PgServiceRepository, PgVisitRepository};
use innkeep_services::ServiceDesk;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{instrument, warn};
use validator::Validate;

/// Price-list entry response DTO
#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub id: i32,
    pub code: String,
    pub title: String,
    pub base_price: Decimal,
    pub is_active: bool,
}

impl From<Service> for ServiceResponse {
    fn from(s: Service) -> Self {
        Self {
            id: s.id,
            code: s.code,
            title: s.title,
            base_price: s.base_price,
            is_active: s.is_active,
        }
    }
}

/// Service order response DTO
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i32,
    pub visit_id: i32,
    pub service_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub status: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ServiceOrder> for OrderResponse {
    fn from(o: ServiceOrder) -> Self {
        Self {
            id: o.id,
            visit_id: o.visit_id,
            service_id: o.service_id,
            quantity: o.quantity,
            unit_price: o.unit_price,
            subtotal: o.subtotal(),
            status: o.status.to_string(),
            note: o.note,
            created_at: o.created_at,
        }
    }
}

/// Request to add a price-list entry
#[derive(Debug, Deserialize, Validate)]
pub struct ServiceCreateRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub base_price: Decimal,
}

/// Request to update a price-list entry
#[derive(Debug, Deserialize)]
pub struct ServiceUpdateRequest {
    pub title: Option<String>,
    pub base_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Request to place an order
#[derive(Debug, Deserialize, Validate)]
pub struct OrderCreateRequest {
    pub visit_id: i32,
    pub service_id: i32,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub note: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

fn service_desk(
    pool: &PgPool,
) -> ServiceDesk<PgServiceRepository, PgServiceOrderRepository, PgVisitRepository> {
    ServiceDesk::new(
        Arc::new(PgServiceRepository::new(pool.clone())),
        Arc::new(PgServiceOrderRepository::new(pool.clone())),
        Arc::new(PgVisitRepository::new(pool.clone())),
        Arc::new(pool.clone()),
    )
}

/// Full price list
///
/// GET /api/v1/services
#[instrument(skip(pool))]
pub async fn list_services(
    pool: web::Data<PgPool>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let desk = service_desk(pool.get_ref());
    let services = desk.list_services(query.limit(), query.offset()).await?;
    let data: Vec<ServiceResponse> = services.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Active services only
///
/// GET /api/v1/services/active
#[instrument(skip(pool))]
pub async fn list_active_services(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let desk = service_desk(pool.get_ref());
    let services = desk.active_services().await?;
    let data: Vec<ServiceResponse> = services.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Add a price-list entry
///
/// POST /api/v1/services
#[instrument(skip(pool, req))]
pub async fn create_service(
    pool: web::Data<PgPool>,
    req: web::Json<ServiceCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Service validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let desk = service_desk(pool.get_ref());
    let service = desk
        .add_service(req.code.clone(), req.title.clone(), req.base_price)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        ServiceResponse::from(service),
        "Service added",
    )))
}

/// Update a price-list entry
///
/// PATCH /api/v1/services/{id}
#[instrument(skip(pool, req))]
pub async fn update_service(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
    req: web::Json<ServiceUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let desk = service_desk(pool.get_ref());
    let service = desk
        .update_service(
            path.into_inner(),
            req.title.clone(),
            req.base_price,
            req.is_active,
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(ServiceResponse::from(service))))
}

/// Place an order against an open visit
///
/// POST /api/v1/services/orders
#[instrument(skip(pool, req))]
pub async fn place_order(
    pool: web::Data<PgPool>,
    req: web::Json<OrderCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Order validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let desk = service_desk(pool.get_ref());
    let order = desk
        .place_order(req.visit_id, req.service_id, req.quantity, req.note.clone())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        OrderResponse::from(order),
        "Order placed",
    )))
}

/// Orders for one visit
///
/// GET /api/v1/services/orders/visit/{visit_id}
#[instrument(skip(pool))]
pub async fn visit_orders(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = service_desk(pool.get_ref());
    let orders = desk.visit_orders(path.into_inner()).await?;
    let data: Vec<OrderResponse> = orders.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Mark an order delivered
///
/// POST /api/v1/services/orders/{id}/complete
#[instrument(skip(pool))]
pub async fn complete_order(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = service_desk(pool.get_ref());
    let order = desk.complete_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        OrderResponse::from(order),
        "Order completed",
    )))
}

/// Cancel a pending order
///
/// POST /api/v1/services/orders/{id}/cancel
#[instrument(skip(pool))]
pub async fn cancel_order(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = service_desk(pool.get_ref());
    let order = desk.cancel_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        OrderResponse::from(order),
        "Order cancelled",
    )))
}

/// Configure service routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/services")
            .route("", web::get().to(list_services))
            .route("", web::post().to(create_service))
            .route("/active", web::get().to(list_active_services))
            .route("/orders", web::post().to(place_order))
            .route("/orders/visit/{visit_id}", web::get().to(visit_orders))
            .route("/orders/{id}/complete", web::post().to(complete_order))
            .route("/orders/{id}/cancel", web::post().to(cancel_order))
            .route("/{id}", web::patch().to(update_service)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_request_validation() {
        let valid = ServiceCreateRequest {
            code: "SPA".to_string(),
            title: "Spa access".to_string(),
            base_price: dec!(1500),
        };
        assert!(valid.validate().is_ok());

        let invalid = ServiceCreateRequest {
            code: "".to_string(),
            ..valid
        };
        assert!(invalid.validate().is_err());
    }
}
