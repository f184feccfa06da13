//! Billing handlers
//!
//! HTTP handlers for bills, payments, and refunds. Every mutating request
//! names the acting staff member; authorization happens in the billing desk.

use crate::dto::{ApiResponse, PaginationParams};
use crate::handlers::{bookings::BookingResponse, stays::VisitResponse};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::models::{Bill, BillItem, Payment, PaymentMethod};
use innkeep_core::{AppConfig, AppError};
use innkeep_db::{PgBillRepository, PgBookingRepository, PgPaymentRepository, PgStaffRepository};
use innkeep_services::{billing_desk::NewBillItem, BillingDesk};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{instrument, warn};
use validator::Validate;

/// Bill response DTO
#[derive(Debug, Serialize)]
pub struct BillResponse {
    pub id: i32,
    pub guest_name: String,
    pub guest_contact: String,
    pub booking_id: Option<i32>,
    pub created_by: i32,
    pub items: Vec<BillItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub paid_amount: Decimal,
    pub balance: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Bill> for BillResponse {
    fn from(b: Bill) -> Self {
        Self {
            id: b.id,
            balance: b.balance(),
            guest_name: b.guest_name,
            guest_contact: b.guest_contact,
            booking_id: b.booking_id,
            created_by: b.created_by,
            items: b.items,
            subtotal: b.subtotal,
            tax: b.tax,
            discount: b.discount,
            total: b.total,
            paid_amount: b.paid_amount,
            status: b.status.to_string(),
            notes: b.notes,
            created_at: b.created_at,
        }
    }
}

/// Payment response DTO
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: i32,
    pub bill_id: i32,
    pub amount: Decimal,
    pub method: String,
    pub received_by: i32,
    pub is_refund: bool,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            bill_id: p.bill_id,
            is_refund: p.is_refund(),
            amount: p.amount,
            method: p.method.to_string(),
            received_by: p.received_by,
            reference: p.reference,
            created_at: p.created_at,
        }
    }
}

/// One input line for bill creation
#[derive(Debug, Deserialize, Validate)]
pub struct BillItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Request to create a bill
#[derive(Debug, Deserialize, Validate)]
pub struct BillCreateRequest {
    pub staff_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub guest_name: String,
    #[validate(length(min = 1, max = 255))]
    pub guest_contact: String,
    pub booking_id: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<BillItemRequest>,
    pub notes: Option<String>,
}

/// Request to create a bill seeded from a booking
#[derive(Debug, Deserialize, Validate)]
pub struct BookingBillRequest {
    pub staff_id: i32,
    pub booking_id: i32,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<BillItemRequest>,
    pub notes: Option<String>,
}

/// Request to check a guest in and open their bill
#[derive(Debug, Deserialize)]
pub struct CheckInWithBillRequest {
    pub staff_id: i32,
    pub booking_id: i32,
    pub guest_id: i32,
    /// Override for the business date; defaults to today
    pub date: Option<NaiveDate>,
}

/// Request to append a line item
#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub staff_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Request to remove a line item by position
#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub staff_id: i32,
    pub index: usize,
}

/// Request to recompute totals with an optional tax override or discount
#[derive(Debug, Deserialize)]
pub struct RecalcRequest {
    pub staff_id: i32,
    pub tax_percent: Option<Decimal>,
    pub discount: Option<Decimal>,
}

/// Request to record a payment
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub staff_id: i32,
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Request to approve a refund
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub staff_id: i32,
    pub amount: Decimal,
    pub notes: Option<String>,
}

/// Request to cancel a bill
#[derive(Debug, Deserialize)]
pub struct CancelBillRequest {
    pub staff_id: i32,
}

/// Bill list filters
#[derive(Debug, Deserialize)]
pub struct BillFilterParams {
    pub status: Option<String>,
    pub created_by: Option<i32>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

type Desk = BillingDesk<PgBillRepository, PgPaymentRepository, PgStaffRepository, PgBookingRepository>;

fn billing_desk(pool: &PgPool, config: &AppConfig) -> Desk {
    BillingDesk::new(
        Arc::new(PgBillRepository::new(pool.clone())),
        Arc::new(PgPaymentRepository::new(pool.clone())),
        Arc::new(PgStaffRepository::new(pool.clone())),
        Arc::new(PgBookingRepository::new(pool.clone())),
        Arc::new(pool.clone()),
        config.billing.clone(),
    )
}

fn parse_method(s: &str) -> Result<PaymentMethod, AppError> {
    PaymentMethod::from_str(s)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown payment method: {}", s)))
}

/// List bills with pagination and filters
///
/// GET /api/v1/bills
#[instrument(skip(pool, config))]
pub async fn list_bills(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    query: web::Query<PaginationParams>,
    filters: web::Query<BillFilterParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let (bills, total) = desk
        .list_bills(
            filters.status.as_deref(),
            filters.created_by,
            filters.from,
            filters.to,
            query.limit(),
            query.offset(),
        )
        .await?;

    let data: Vec<BillResponse> = bills.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Create a bill
///
/// POST /api/v1/bills
#[instrument(skip(pool, config, req))]
pub async fn create_bill(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: web::Json<BillCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Bill validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let items = req
        .items
        .iter()
        .map(|i| NewBillItem {
            description: i.description.clone(),
            quantity: i.quantity,
            unit_price: i.unit_price,
        })
        .collect();

    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let bill = desk
        .create_bill(
            req.staff_id,
            req.guest_name.clone(),
            req.guest_contact.clone(),
            req.booking_id,
            items,
            req.notes.clone(),
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        BillResponse::from(bill),
        "Bill created",
    )))
}

/// Create a bill for a booking, seeded with the lodging line
///
/// POST /api/v1/bills/for-booking
#[instrument(skip(pool, config, req))]
pub async fn create_bill_for_booking(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: web::Json<BookingBillRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Bill validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let items = req
        .items
        .iter()
        .map(|i| NewBillItem {
            description: i.description.clone(),
            quantity: i.quantity,
            unit_price: i.unit_price,
        })
        .collect();

    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let bill = desk
        .create_bill_for_booking(req.staff_id, req.booking_id, items, req.notes.clone())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        BillResponse::from(bill),
        "Bill created",
    )))
}

/// Check a guest in and open their bill atomically
///
/// POST /api/v1/bills/check-in
#[instrument(skip(pool, config, req))]
pub async fn check_in_with_bill(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: web::Json<CheckInWithBillRequest>,
) -> Result<HttpResponse, AppError> {
    let today = req.date.unwrap_or_else(|| Utc::now().date_naive());
    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let (booking, visit, bill) = desk
        .check_in_with_bill(req.staff_id, req.booking_id, req.guest_id, today)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        serde_json::json!({
            "booking": BookingResponse::from(booking),
            "visit": VisitResponse::from(visit),
            "bill": BillResponse::from(bill),
        }),
        "Guest checked in",
    )))
}

/// Get one bill
///
/// GET /api/v1/bills/{id}
#[instrument(skip(pool, config))]
pub async fn get_bill(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let bill = desk.get_bill(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(BillResponse::from(bill))))
}

/// Append a line item
///
/// POST /api/v1/bills/{id}/items
#[instrument(skip(pool, config, req))]
pub async fn add_item(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    req: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Item validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let bill = desk
        .add_item(
            req.staff_id,
            path.into_inner(),
            req.description.clone(),
            req.quantity,
            req.unit_price,
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(BillResponse::from(bill))))
}

/// Remove a line item by position
///
/// DELETE /api/v1/bills/{id}/items
#[instrument(skip(pool, config, req))]
pub async fn remove_item(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    req: web::Json<RemoveItemRequest>,
) -> Result<HttpResponse, AppError> {
    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let bill = desk
        .remove_item(req.staff_id, path.into_inner(), req.index)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(BillResponse::from(bill))))
}

/// Recompute totals with an optional tax override or discount
///
/// POST /api/v1/bills/{id}/recalc
#[instrument(skip(pool, config, req))]
pub async fn recalc_bill(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    req: web::Json<RecalcRequest>,
) -> Result<HttpResponse, AppError> {
    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let bill = desk
        .recalc_bill(req.staff_id, path.into_inner(), req.tax_percent, req.discount)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(BillResponse::from(bill))))
}

/// Record a payment
///
/// POST /api/v1/bills/{id}/payments
#[instrument(skip(pool, config, req))]
pub async fn record_payment(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    req: web::Json<PaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let method = parse_method(&req.method)?;
    let desk = billing_desk(pool.get_ref(), config.get_ref());

    let (bill, payment) = desk
        .record_payment(
            req.staff_id,
            path.into_inner(),
            req.amount,
            method,
            req.reference.clone(),
            req.notes.clone(),
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        serde_json::json!({
            "bill": BillResponse::from(bill),
            "payment": PaymentResponse::from(payment),
        }),
        "Payment recorded",
    )))
}

/// Approve a refund (managers only)
///
/// POST /api/v1/bills/{id}/refunds
#[instrument(skip(pool, config, req))]
pub async fn approve_refund(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    req: web::Json<RefundRequest>,
) -> Result<HttpResponse, AppError> {
    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let (bill, payment) = desk
        .approve_refund(req.staff_id, path.into_inner(), req.amount, req.notes.clone())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        serde_json::json!({
            "bill": BillResponse::from(bill),
            "payment": PaymentResponse::from(payment),
        }),
        "Refund approved",
    )))
}

/// Cancel a bill
///
/// POST /api/v1/bills/{id}/cancel
#[instrument(skip(pool, config, req))]
pub async fn cancel_bill(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    req: web::Json<CancelBillRequest>,
) -> Result<HttpResponse, AppError> {
    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let bill = desk.cancel_bill(req.staff_id, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        BillResponse::from(bill),
        "Bill cancelled",
    )))
}

/// Payment history for a bill
///
/// GET /api/v1/bills/{id}/payments
#[instrument(skip(pool, config))]
pub async fn bill_payments(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let desk = billing_desk(pool.get_ref(), config.get_ref());
    let payments = desk.bill_payments(path.into_inner()).await?;
    let data: Vec<PaymentResponse> = payments.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Configure billing routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bills")
            .route("", web::get().to(list_bills))
            .route("", web::post().to(create_bill))
            .route("/for-booking", web::post().to(create_bill_for_booking))
            .route("/check-in", web::post().to(check_in_with_bill))
            .route("/{id}", web::get().to(get_bill))
            .route("/{id}/items", web::post().to(add_item))
            .route("/{id}/items", web::delete().to(remove_item))
            .route("/{id}/recalc", web::post().to(recalc_bill))
            .route("/{id}/payments", web::get().to(bill_payments))
            .route("/{id}/payments", web::post().to(record_payment))
            .route("/{id}/refunds", web::post().to(approve_refund))
            .route("/{id}/cancel", web::post().to(cancel_bill)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_request_validation() {
        let valid = BillCreateRequest {
            staff_id: 1,
            guest_name: "Anna Koval".to_string(),
            guest_contact: "anna@example.com".to_string(),
            booking_id: None,
            items: vec![BillItemRequest {
                description: "Breakfast".to_string(),
                quantity: dec!(3),
                unit_price: dec!(350),
            }],
            notes: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = BillCreateRequest {
            guest_name: "".to_string(),
            ..valid
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_parse_method() {
        assert!(parse_method("cash").is_ok());
        assert!(parse_method("barter").is_err());
    }
}
