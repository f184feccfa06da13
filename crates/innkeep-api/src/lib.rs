//! API layer for Innkeep
//!
//! HTTP API handlers for rooms, bookings, guests, stays, services,
//! billing, staff, and reports.

pub mod dto;
pub mod handlers;

// Re-export DTOs (common types)
pub use dto::{ApiResponse, PaginationParams};

// Re-export handler configuration functions
pub use handlers::{
    configure_billing, configure_bookings, configure_guests, configure_reports, configure_rooms,
    configure_services, configure_staff, configure_stays,
};
