//! Gateway handlers

pub mod health;
pub mod transfer;

pub use health::{HealthResponse, health_check};
pub use transfer::{get_transfer, post_transfer};
