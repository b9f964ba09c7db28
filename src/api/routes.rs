//! API route definitions
//!
//! - /api/v1/ratios/:producer_id - connectivity ratios of a producer
//! - /api/v1/production/:producer_id - production / injection forecast
//! - /api/v1/field-averages - current field average table
//! - /health - liveness and storage backend

use axum::{routing::get, Router};

use super::handlers::{self, ApiState};

/// Versioned API routes, nested under `/api/v1`
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/ratios/:producer_id", get(handlers::get_ratios))
        .route("/production/:producer_id", get(handlers::get_production))
        .route("/field-averages", get(handlers::get_field_averages))
        .with_state(state)
}

/// Health endpoint at root level
pub fn health_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
