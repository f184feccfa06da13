//! Innkeep Database Layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the Innkeep hotel back office. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for all domain entities
//! - Overlap-aware availability queries for rooms and bookings
//! - Transaction support for atomic operations

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use innkeep_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
