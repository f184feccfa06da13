//! Data transfer objects

pub mod common;

pub use common::{ApiResponse, PaginationParams};
