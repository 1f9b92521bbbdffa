//! HTTP route handlers
//!
//! - `ui`: the HTML form shell
//! - `recommend`: JSON recommendation endpoint
//! - `catalog`: selector options and catalog reload
//! - `health`: liveness, readiness and metadata

pub mod catalog;
pub mod health;
pub mod recommend;
pub mod ui;

use crate::error::ServerError;

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
