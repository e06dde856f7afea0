//! # API Handlers
//!
//! HTTP endpoints for the tender marketplace. Handlers only parse inputs and
//! map results; every rule lives in [`crate::services`].

use crate::models::ServiceInfo;
use axum::response::Json;

pub mod bids;
pub mod tenders;
pub mod types;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/api/ping",
    responses(
        (status = 200, description = "Service is up", body = String, content_type = "text/plain")
    ),
    tag = "root"
)]
pub async fn ping() -> &'static str {
    "ok"
}
