//! Unified error handling for Innkeep
//!
//! This module provides a comprehensive error type that covers all possible
//! failure scenarios in the application, with automatic HTTP response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Authorization Errors ====================
    #[error("Forbidden: insufficient role for {0}")]
    Forbidden(String),

    // ==================== Business Logic Errors ====================
    #[error("Room not found: {0}")]
    RoomNotFound(i32),

    #[error("Booking not found: {0}")]
    BookingNotFound(i32),

    #[error("Guest not found: {0}")]
    GuestNotFound(i32),

    #[error("Visit not found: {0}")]
    VisitNotFound(i32),

    #[error("Service not found: {0}")]
    ServiceNotFound(i32),

    #[error("Service order not found: {0}")]
    ServiceOrderNotFound(i32),

    #[error("Bill not found: {0}")]
    BillNotFound(i32),

    #[error("Staff member not found: {0}")]
    StaffNotFound(i32),

    #[error("Room {room} is not available for {check_in}..{check_out}")]
    RoomUnavailable {
        room: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Invalid state transition: {0}")]
    StateConflict(String),

    #[error("Refund of {requested} exceeds paid amount {paid}")]
    RefundExceedsPaid { requested: Decimal, paid: Decimal },

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) | AppError::InvalidInput(_) | AppError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }

            // 403 Forbidden
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::RoomNotFound(_)
            | AppError::BookingNotFound(_)
            | AppError::GuestNotFound(_)
            | AppError::VisitNotFound(_)
            | AppError::ServiceNotFound(_)
            | AppError::ServiceOrderNotFound(_)
            | AppError::BillNotFound(_)
            | AppError::StaffNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::RoomUnavailable { .. }
            | AppError::StateConflict(_)
            | AppError::RefundExceedsPaid { .. }
            | AppError::Conflict(_)
            | AppError::AlreadyExists(_) => StatusCode::CONFLICT,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Forbidden(_) => "forbidden",
            AppError::RoomNotFound(_) => "room_not_found",
            AppError::BookingNotFound(_) => "booking_not_found",
            AppError::GuestNotFound(_) => "guest_not_found",
            AppError::VisitNotFound(_) => "visit_not_found",
            AppError::ServiceNotFound(_) => "service_not_found",
            AppError::ServiceOrderNotFound(_) => "service_order_not_found",
            AppError::BillNotFound(_) => "bill_not_found",
            AppError::StaffNotFound(_) => "staff_not_found",
            AppError::RoomUnavailable { .. } => "room_unavailable",
            AppError::StateConflict(_) => "state_conflict",
            AppError::RefundExceedsPaid { .. } => "refund_exceeds_paid",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::MissingField(_) => "missing_field",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::Forbidden("approve_refund".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::BookingNotFound(42).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::StateConflict("cannot check out a pending booking".to_string())
                .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::RefundExceedsPaid {
                requested: Decimal::new(10000, 2),
                paid: Decimal::new(5000, 2)
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Validation("check_out must be after check_in".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::StateConflict("x".to_string()).error_code(),
            "state_conflict"
        );
        assert_eq!(
            AppError::RoomUnavailable {
                room: "101".to_string(),
                check_in: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                check_out: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()
            }
            .error_code(),
            "room_unavailable"
        );
    }
}
