//! HTTP request handlers

pub mod billing;
pub mod bookings;
pub mod guests;
pub mod reports;
pub mod rooms;
pub mod services;
pub mod staff;
pub mod stays;

pub use billing::configure as configure_billing;
pub use bookings::configure as configure_bookings;
pub use guests::configure as configure_guests;
pub use reports::configure as configure_reports;
pub use rooms::configure as configure_rooms;
pub use services::configure as configure_services;
pub use staff::configure as configure_staff;
pub use stays::configure as configure_stays;
