//! Staff handlers
//!
//! HTTP handlers for staff accounts. Accounts are deactivated rather than
//! deleted so billing history keeps its authors.

use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::models::{Staff, StaffRole};
use innkeep_core::AppError;
use innkeep_db::PgStaffRepository;
use innkeep_services::StaffDirectory;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{instrument, warn};
use validator::Validate;

/// Staff response DTO
#[derive(Debug, Serialize)]
pub struct StaffResponse {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub hire_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Staff> for StaffResponse {
    fn from(s: Staff) -> Self {
        Self {
            id: s.id,
            full_name: s.full_name,
            email: s.email,
            phone: s.phone,
            role: s.role.to_string(),
            hire_date: s.hire_date,
            termination_date: s.termination_date,
            is_active: s.is_active,
            notes: s.notes,
            created_at: s.created_at,
        }
    }
}

/// Request to add a staff member
#[derive(Debug, Deserialize, Validate)]
pub struct StaffCreateRequest {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    /// Defaults to today when omitted
    pub hire_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Request to update a staff member
#[derive(Debug, Deserialize)]
pub struct StaffUpdateRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub notes: Option<String>,
}

/// Optional deactivation payload; the date defaults to today
#[derive(Debug, Deserialize)]
pub struct DeactivateStaffRequest {
    pub date: Option<NaiveDate>,
}

/// Active staff filter
#[derive(Debug, Deserialize)]
pub struct ActiveStaffParams {
    pub role: Option<String>,
}

fn staff_directory(pool: &PgPool) -> StaffDirectory<PgStaffRepository> {
    StaffDirectory::new(Arc::new(PgStaffRepository::new(pool.clone())))
}

fn parse_role(s: &str) -> Result<StaffRole, AppError> {
    StaffRole::from_str(s)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown staff role: {}", s)))
}

/// List all staff members
///
/// GET /api/v1/staff
#[instrument(skip(pool))]
pub async fn list_staff(
    pool: web::Data<PgPool>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let directory = staff_directory(pool.get_ref());
    let members = directory.list_members(query.limit(), query.offset()).await?;
    let data: Vec<StaffResponse> = members.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Active staff only, optionally by role
///
/// GET /api/v1/staff/active
#[instrument(skip(pool))]
pub async fn list_active_staff(
    pool: web::Data<PgPool>,
    query: web::Query<ActiveStaffParams>,
) -> Result<HttpResponse, AppError> {
    if let Some(r) = query.role.as_deref() {
        parse_role(r)?;
    }

    let directory = staff_directory(pool.get_ref());
    let members = directory.active_members(query.role.as_deref()).await?;
    let data: Vec<StaffResponse> = members.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Add a staff member
///
/// POST /api/v1/staff
#[instrument(skip(pool, req))]
pub async fn create_staff(
    pool: web::Data<PgPool>,
    req: web::Json<StaffCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Staff validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let role = parse_role(&req.role)?;
    let hire_date = req.hire_date.unwrap_or_else(|| Utc::now().date_naive());
    let directory = staff_directory(pool.get_ref());
    let member = directory
        .add_member(
            req.full_name.clone(),
            req.email.clone(),
            role,
            req.phone.clone(),
            hire_date,
            req.notes.clone(),
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        StaffResponse::from(member),
        "Staff member added",
    )))
}

/// Get one staff member
///
/// GET /api/v1/staff/{id}
#[instrument(skip(pool))]
pub async fn get_staff(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let directory = staff_directory(pool.get_ref());
    let member = directory.get_member(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(StaffResponse::from(member))))
}

/// Update a staff member
///
/// PATCH /api/v1/staff/{id}
#[instrument(skip(pool, req))]
pub async fn update_staff(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
    req: web::Json<StaffUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let role = req.role.as_deref().map(parse_role).transpose()?;

    let directory = staff_directory(pool.get_ref());
    let member = directory
        .update_member(
            path.into_inner(),
            req.full_name.clone(),
            req.email.clone(),
            req.phone.clone(),
            role,
            req.notes.clone(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(StaffResponse::from(member))))
}

/// Deactivate a staff account
///
/// POST /api/v1/staff/{id}/deactivate
#[instrument(skip(pool, req))]
pub async fn deactivate_staff(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
    req: Option<web::Json<DeactivateStaffRequest>>,
) -> Result<HttpResponse, AppError> {
    let date = req
        .and_then(|r| r.date)
        .unwrap_or_else(|| Utc::now().date_naive());

    let directory = staff_directory(pool.get_ref());
    let member = directory.deactivate_member(path.into_inner(), date).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        StaffResponse::from(member),
        "Staff member deactivated",
    )))
}

/// Reactivate a staff account
///
/// POST /api/v1/staff/{id}/activate
#[instrument(skip(pool))]
pub async fn activate_staff(
    pool: web::Data<PgPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let directory = staff_directory(pool.get_ref());
    let member = directory.activate_member(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        StaffResponse::from(member),
        "Staff member reactivated",
    )))
}

/// Configure staff routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/staff")
            .route("", web::get().to(list_staff))
            .route("", web::post().to(create_staff))
            .route("/active", web::get().to(list_active_staff))
            .route("/{id}", web::get().to(get_staff))
            .route("/{id}", web::patch().to(update_staff))
            .route("/{id}/deactivate", web::post().to(deactivate_staff))
            .route("/{id}/activate", web::post().to(activate_staff)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let valid = StaffCreateRequest {
            full_name: "Olga Petrova".to_string(),
            email: "olga@innkeep.example".to_string(),
            phone: None,
            role: "manager".to_string(),
            hire_date: None,
            notes: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = StaffCreateRequest {
            email: "not-an-email".to_string(),
            ..valid
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_parse_role() {
        assert!(parse_role("receptionist").is_ok());
        assert!(parse_role("janitor").is_err());
    }
}
