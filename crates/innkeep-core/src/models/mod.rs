//! Domain models for Innkeep
//!
//! This module contains all the core domain models used throughout the application.

pub mod billing;
pub mod booking;
pub mod guest;
pub mod room;
pub mod service;
pub mod staff;

pub use billing::{Bill, BillItem, BillStatus, Payment, PaymentMethod};
pub use booking::{Booking, BookingStatus};
pub use guest::{Guest, GuestVisit};
pub use room::{dates_overlap, Room, RoomType};
pub use service::{Service, ServiceOrder, ServiceOrderStatus};
pub use staff::{Staff, StaffRole};
