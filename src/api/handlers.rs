//! API request handlers
//!
//! Engine calls do synchronous repository reads and may run the series
//! forecaster, so each one is moved onto the blocking pool.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use super::envelope::ApiErrorResponse;
use crate::crm::{CrmEngine, CrmError};
use crate::types::WellId;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<CrmEngine>,
}

impl ApiState {
    pub fn new(engine: Arc<CrmEngine>) -> Self {
        Self { engine }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub version: &'static str,
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_well_id(raw: &str) -> Result<WellId, Response> {
    raw.parse::<WellId>()
        .map_err(|_| ApiErrorResponse::bad_request(format!("invalid producer id: {raw}")))
}

/// Run an engine call on the blocking pool and serialize its result.
async fn run_engine<T, F>(state: ApiState, producer_id: WellId, call: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&CrmEngine) -> Result<T, CrmError> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    match tokio::task::spawn_blocking(move || call(engine.as_ref())).await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e)) => {
            if e.is_client_error() {
                warn!(producer_id, error = %e, "Request rejected");
            } else {
                error!(producer_id, error = %e, "Request failed");
            }
            ApiErrorResponse::from_crm(&e)
        }
        Err(e) => {
            error!(producer_id, error = %e, "Engine task panicked or was cancelled");
            ApiErrorResponse::internal("internal error")
        }
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// GET /api/v1/ratios/:producer_id
pub async fn get_ratios(State(state): State<ApiState>, Path(raw_id): Path<String>) -> Response {
    let producer_id = match parse_well_id(&raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    run_engine(state, producer_id, move |engine| engine.ratios(producer_id)).await
}

/// GET /api/v1/production/:producer_id
pub async fn get_production(State(state): State<ApiState>, Path(raw_id): Path<String>) -> Response {
    let producer_id = match parse_well_id(&raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    run_engine(state, producer_id, move |engine| engine.production(producer_id)).await
}

/// GET /api/v1/field-averages
pub async fn get_field_averages(State(state): State<ApiState>) -> Response {
    let engine = Arc::clone(&state.engine);
    match tokio::task::spawn_blocking(move || engine.field_averages()).await {
        Ok(averages) => Json(averages).into_response(),
        Err(e) => {
            error!(error = %e, "Field average task failed");
            ApiErrorResponse::internal("internal error")
        }
    }
}

/// GET /health
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.engine.backend_name(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
