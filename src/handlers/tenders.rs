//! # Tender API Handlers

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    response::Json,
};

use crate::error::{ApiError, ErrorResponse};
use crate::handlers::types::{
    CreateTenderRequest, EditTenderRequest, QueryParams, json_body, parse_id, parse_version,
};
use crate::models::TenderView;
use crate::server::AppState;
use crate::services::CreateTenderInput;

/// List published tenders
#[utoipa::path(
    get,
    path = "/api/tenders",
    params(
        ("limit" = Option<u64>, Query, description = "Page size (default 5)"),
        ("offset" = Option<u64>, Query, description = "Items to skip (default 0)"),
        ("service_type" = Option<Vec<String>>, Query, description = "Repeatable service type filter")
    ),
    responses(
        (status = 200, description = "Published tenders ordered by name", body = Vec<TenderView>),
        (status = 400, description = "Invalid pagination parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn list_tenders(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<Json<Vec<TenderView>>, ApiError> {
    let page = params.page(state.default_page)?;
    let tenders = state
        .tenders
        .list(params.all("service_type"), page)
        .await?;
    Ok(Json(tenders))
}

/// Create a tender
#[utoipa::path(
    post,
    path = "/api/tenders/new",
    request_body = CreateTenderRequest,
    responses(
        (status = 200, description = "Tender created at version 1", body = TenderView),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Unknown creator", body = ErrorResponse),
        (status = 403, description = "Creator is not responsible for the organization", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn create_tender(
    State(state): State<AppState>,
    body: Result<Json<CreateTenderRequest>, JsonRejection>,
) -> Result<Json<TenderView>, ApiError> {
    let request = json_body(body)?;
    let tender = state
        .tenders
        .create(CreateTenderInput {
            name: request.name,
            description: request.description,
            service_type: request.service_type,
            organization_id: request.organization_id,
            creator_username: request.creator_username,
        })
        .await?;
    Ok(Json(tender))
}

/// List the caller's tenders
#[utoipa::path(
    get,
    path = "/api/tenders/my",
    params(
        ("username" = String, Query, description = "Caller username"),
        ("limit" = Option<u64>, Query, description = "Page size (default 5)"),
        ("offset" = Option<u64>, Query, description = "Items to skip (default 0)")
    ),
    responses(
        (status = 200, description = "Tenders authored by the caller", body = Vec<TenderView>),
        (status = 400, description = "Invalid pagination parameters", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn my_tenders(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<Json<Vec<TenderView>>, ApiError> {
    let page = params.page(state.default_page)?;
    let tenders = state.tenders.list_mine(&params.username(), page).await?;
    Ok(Json(tenders))
}

/// Get a tender's status
#[utoipa::path(
    get,
    path = "/api/tenders/{id}/status",
    params(
        ("id" = String, Path, description = "Tender id"),
        ("username" = String, Query, description = "Caller username")
    ),
    responses(
        (status = 200, description = "Current status", body = String),
        (status = 400, description = "Invalid tender id", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Caller is not responsible for the tender", body = ErrorResponse),
        (status = 404, description = "Tender not found", body = ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn tender_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: QueryParams,
) -> Result<Json<String>, ApiError> {
    let tender_id = parse_id(&id)?;
    let status = state
        .tenders
        .get_status(tender_id, &params.username())
        .await?;
    Ok(Json(status))
}

/// Change a tender's status
#[utoipa::path(
    put,
    path = "/api/tenders/{id}/status",
    params(
        ("id" = String, Path, description = "Tender id"),
        ("status" = String, Query, description = "New status"),
        ("username" = String, Query, description = "Caller username")
    ),
    responses(
        (status = 200, description = "Updated tender", body = TenderView),
        (status = 400, description = "Invalid id or status", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Caller is not responsible for the tender", body = ErrorResponse),
        (status = 404, description = "Tender not found", body = ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn update_tender_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: QueryParams,
) -> Result<Json<TenderView>, ApiError> {
    let tender_id = parse_id(&id)?;
    let tender = state
        .tenders
        .update_status(tender_id, &params.username(), &params.text("status"))
        .await?;
    Ok(Json(tender))
}

/// Edit a tender, producing a new version
#[utoipa::path(
    patch,
    path = "/api/tenders/{id}/edit",
    params(
        ("id" = String, Path, description = "Tender id"),
        ("username" = String, Query, description = "Caller username")
    ),
    request_body = EditTenderRequest,
    responses(
        (status = 200, description = "Tender at its new version", body = TenderView),
        (status = 400, description = "Invalid id, body or attribute value", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Caller is not responsible for the tender", body = ErrorResponse),
        (status = 404, description = "Tender not found", body = ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn edit_tender(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: QueryParams,
    body: Result<Json<EditTenderRequest>, JsonRejection>,
) -> Result<Json<TenderView>, ApiError> {
    let tender_id = parse_id(&id)?;
    let patch = json_body(body)?.into_patch();
    let tender = state
        .tenders
        .edit(tender_id, &params.username(), patch)
        .await?;
    Ok(Json(tender))
}

/// Restore an earlier version as a new version
#[utoipa::path(
    put,
    path = "/api/tenders/{id}/rollback/{version}",
    params(
        ("id" = String, Path, description = "Tender id"),
        ("version" = i32, Path, description = "Version to restore"),
        ("username" = String, Query, description = "Caller username")
    ),
    responses(
        (status = 200, description = "Tender at its new version", body = TenderView),
        (status = 400, description = "Invalid id or version", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Caller is not responsible for the tender", body = ErrorResponse),
        (status = 404, description = "Tender or version not found", body = ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn rollback_tender(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
    params: QueryParams,
) -> Result<Json<TenderView>, ApiError> {
    let tender_id = parse_id(&id)?;
    let version = parse_version(&version)?;
    let tender = state
        .tenders
        .rollback(tender_id, &params.username(), version)
        .await?;
    Ok(Json(tender))
}
