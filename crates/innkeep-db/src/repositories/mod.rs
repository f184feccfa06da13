//! Repository implementations
//!
//! This module contains concrete implementations of all repository traits
//! defined in innkeep-core, using sqlx for PostgreSQL access.

pub mod bill_repo;
pub mod booking_repo;
pub mod guest_repo;
pub mod room_repo;
pub mod service_repo;
pub mod staff_repo;

pub use bill_repo::{PgBillRepository, PgPaymentRepository};
pub use booking_repo::PgBookingRepository;
pub use guest_repo::{PgGuestRepository, PgVisitRepository};
pub use room_repo::PgRoomRepository;
pub use service_repo::{PgServiceOrderRepository, PgServiceRepository};
pub use staff_repo::PgStaffRepository;
