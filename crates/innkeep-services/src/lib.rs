//! Business logic services for Innkeep
//!
//! This crate contains the services that orchestrate the hotel's back
//! office: room inventory and bookings, the front desk check-in/check-out
//! flow, service orders, billing, and reporting.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies (repositories, pool)
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - Multi-step flows run inside a single database transaction
//! - All operations are instrumented with tracing

pub mod billing_desk;
pub mod booking_desk;
pub mod front_desk;
pub mod reporting;
pub mod service_desk;
pub mod staff_directory;

pub use billing_desk::BillingDesk;
pub use booking_desk::BookingDesk;
pub use front_desk::FrontDesk;
pub use reporting::ReportingService;
pub use service_desk::ServiceDesk;
pub use staff_directory::StaffDirectory;
