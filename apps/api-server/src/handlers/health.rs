//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::observability::RequestId;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: &'static str,
    pub request_id: String,
    pub timestamp: String,
}

/// GET /health/
pub async fn health_check(state: web::Data<AppState>, request_id: RequestId) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.storage,
        request_id: request_id.0,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
