//! Common traits for repositories
//!
//! Defines abstractions for database access.

use crate::error::AppError;
use crate::models::{
    Bill, Booking, BookingStatus, Guest, GuestVisit, Payment, Room, Service, ServiceOrder, Staff,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    /// Find entity by ID
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;

    /// Find all entities with pagination
    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<T>, AppError>;

    /// Count total entities
    async fn count(&self) -> Result<i64, AppError>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<T, AppError>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> Result<T, AppError>;

    /// Delete entity by ID
    async fn delete(&self, id: ID) -> Result<bool, AppError>;
}

/// Room repository trait with specialized methods
#[async_trait]
pub trait RoomRepository: Repository<Room, i32> {
    /// Find room by its unique number
    async fn find_by_number(&self, number: &str) -> Result<Option<Room>, AppError>;

    /// List rooms with filtering
    async fn list_filtered(
        &self,
        room_type: Option<&str>,
        floor: Option<i32>,
        min_capacity: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Room>, i64), AppError>;

    /// Rooms free for the whole half-open date range, optionally filtered
    /// by type and capacity. Unavailable rooms are never returned.
    async fn find_available(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_type: Option<&str>,
        min_capacity: Option<i32>,
    ) -> Result<Vec<Room>, AppError>;
}

/// Booking repository trait with specialized methods
#[async_trait]
pub trait BookingRepository: Repository<Booking, i32> {
    /// List bookings with filtering
    async fn list_filtered(
        &self,
        room_id: Option<i32>,
        status: Option<BookingStatus>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Booking>, i64), AppError>;

    /// Bookings arriving on the given date (for the front desk's day sheet)
    async fn find_arrivals(&self, date: NaiveDate) -> Result<Vec<Booking>, AppError>;
}

/// Guest repository trait with specialized methods
#[async_trait]
pub trait GuestRepository: Repository<Guest, i32> {
    /// Search guests by name, phone, email or document number
    async fn search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Guest>, i64), AppError>;

    /// Find guest by document number
    async fn find_by_doc_number(&self, doc_number: &str) -> Result<Option<Guest>, AppError>;
}

/// Visit repository trait with specialized methods
#[async_trait]
pub trait VisitRepository: Repository<GuestVisit, i32> {
    /// Find the visit opened for a booking, if any
    async fn find_by_booking(&self, booking_id: i32) -> Result<Option<GuestVisit>, AppError>;

    /// All visits of one guest, newest first
    async fn find_by_guest(&self, guest_id: i32) -> Result<Vec<GuestVisit>, AppError>;

    /// Visits without a checkout timestamp
    async fn find_open(&self) -> Result<Vec<GuestVisit>, AppError>;
}

/// Service price-list repository trait with specialized methods
#[async_trait]
pub trait ServiceRepository: Repository<Service, i32> {
    /// Find service by its unique code
    async fn find_by_code(&self, code: &str) -> Result<Option<Service>, AppError>;

    /// Active services only, for the order form
    async fn find_active(&self) -> Result<Vec<Service>, AppError>;
}

/// Service order repository trait with specialized methods
#[async_trait]
pub trait ServiceOrderRepository: Repository<ServiceOrder, i32> {
    /// All orders placed against a visit
    async fn find_by_visit(&self, visit_id: i32) -> Result<Vec<ServiceOrder>, AppError>;
}

/// Bill repository trait with specialized methods
#[async_trait]
pub trait BillRepository: Repository<Bill, i32> {
    /// Find the bill linked to a booking, if any
    async fn find_by_booking(&self, booking_id: i32) -> Result<Option<Bill>, AppError>;

    /// List bills with filtering
    async fn list_filtered(
        &self,
        status: Option<&str>,
        created_by: Option<i32>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Bill>, i64), AppError>;
}

/// Payment repository trait with specialized methods
#[async_trait]
pub trait PaymentRepository: Repository<Payment, i32> {
    /// All payments recorded against a bill, oldest first
    async fn find_by_bill(&self, bill_id: i32) -> Result<Vec<Payment>, AppError>;
}

/// Staff repository trait with specialized methods
#[async_trait]
pub trait StaffRepository: Repository<Staff, i32> {
    /// Find staff member by unique email
    async fn find_by_email(&self, email: &str) -> Result<Option<Staff>, AppError>;

    /// Active staff, optionally filtered by role
    async fn find_active(&self, role: Option<&str>) -> Result<Vec<Staff>, AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10); // page 0 becomes 1
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 2000); // per_page capped at 1000
        assert_eq!(p.per_page, 1000);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(95, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(100, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(101, 1, 10);
        assert_eq!(meta.total_pages, 11);
    }
}
