//! # Bid API Handlers

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    response::Json,
};

use crate::error::{ApiError, ErrorResponse};
use crate::handlers::types::{
    CreateBidRequest, EditBidRequest, QueryParams, json_body, parse_id, parse_version,
};
use crate::models::BidView;
use crate::server::AppState;
use crate::services::CreateBidInput;

/// Submit a bid on a published tender
#[utoipa::path(
    post,
    path = "/api/bids/new",
    request_body = CreateBidRequest,
    responses(
        (status = 200, description = "Bid created at version 1", body = BidView),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Unknown author", body = ErrorResponse),
        (status = 403, description = "Tender not published or author has no organization", body = ErrorResponse),
        (status = 404, description = "Tender not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "bids"
)]
pub async fn create_bid(
    State(state): State<AppState>,
    body: Result<Json<CreateBidRequest>, JsonRejection>,
) -> Result<Json<BidView>, ApiError> {
    let request = json_body(body)?;
    let bid = state
        .bids
        .create(CreateBidInput {
            name: request.name,
            description: request.description,
            tender_id: request.tender_id,
            author_type: request.author_type,
            author_id: request.author_id,
        })
        .await?;
    Ok(Json(bid))
}

/// List the caller's bids
#[utoipa::path(
    get,
    path = "/api/bids/my",
    params(
        ("username" = String, Query, description = "Caller username"),
        ("limit" = Option<u64>, Query, description = "Page size (default 5)"),
        ("offset" = Option<u64>, Query, description = "Items to skip (default 0)")
    ),
    responses(
        (status = 200, description = "Bids authored by the caller", body = Vec<BidView>),
        (status = 400, description = "Invalid pagination parameters", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse)
    ),
    tag = "bids"
)]
pub async fn my_bids(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<Json<Vec<BidView>>, ApiError> {
    let page = params.page(state.default_page)?;
    let bids = state.bids.list_mine(&params.username(), page).await?;
    Ok(Json(bids))
}

/// List bids placed on a tender
#[utoipa::path(
    get,
    path = "/api/bids/{id}/list",
    params(
        ("id" = String, Path, description = "Tender id"),
        ("username" = String, Query, description = "Caller username"),
        ("limit" = Option<u64>, Query, description = "Page size (default 5)"),
        ("offset" = Option<u64>, Query, description = "Items to skip (default 0)")
    ),
    responses(
        (status = 200, description = "Bids on the tender", body = Vec<BidView>),
        (status = 400, description = "Invalid id or pagination parameters", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Caller is not responsible for the tender", body = ErrorResponse),
        (status = 404, description = "Tender or bids not found", body = ErrorResponse)
    ),
    tag = "bids"
)]
pub async fn tender_bids(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: QueryParams,
) -> Result<Json<Vec<BidView>>, ApiError> {
    let tender_id = parse_id(&id)?;
    let page = params.page(state.default_page)?;
    let bids = state
        .bids
        .list_for_tender(tender_id, &params.username(), page)
        .await?;
    Ok(Json(bids))
}

/// Get a bid's status
#[utoipa::path(
    get,
    path = "/api/bids/{id}/status",
    params(
        ("id" = String, Path, description = "Bid id"),
        ("username" = String, Query, description = "Caller username")
    ),
    responses(
        (status = 200, description = "Current status", body = String),
        (status = 400, description = "Invalid bid id", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Bid not visible to the caller", body = ErrorResponse),
        (status = 404, description = "Bid not found", body = ErrorResponse)
    ),
    tag = "bids"
)]
pub async fn bid_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: QueryParams,
) -> Result<Json<String>, ApiError> {
    let bid_id = parse_id(&id)?;
    let status = state.bids.get_status(bid_id, &params.username()).await?;
    Ok(Json(status))
}

/// Change a bid's status
#[utoipa::path(
    put,
    path = "/api/bids/{id}/status",
    params(
        ("id" = String, Path, description = "Bid id"),
        ("status" = String, Query, description = "New status"),
        ("username" = String, Query, description = "Caller username")
    ),
    responses(
        (status = 200, description = "Updated bid", body = BidView),
        (status = 400, description = "Invalid id or status", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Bid not visible to the caller", body = ErrorResponse),
        (status = 404, description = "Bid not found", body = ErrorResponse)
    ),
    tag = "bids"
)]
pub async fn update_bid_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: QueryParams,
) -> Result<Json<BidView>, ApiError> {
    let bid_id = parse_id(&id)?;
    let bid = state
        .bids
        .update_status(bid_id, &params.username(), &params.text("status"))
        .await?;
    Ok(Json(bid))
}

/// Approve or reject a bid
#[utoipa::path(
    put,
    path = "/api/bids/{id}/submit_decision",
    params(
        ("id" = String, Path, description = "Bid id"),
        ("decision" = String, Query, description = "`Approved` or `Rejected`"),
        ("username" = String, Query, description = "Caller username")
    ),
    responses(
        (status = 200, description = "Bid after the decision", body = BidView),
        (status = 400, description = "Invalid id or decision", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Caller is not responsible for the tender", body = ErrorResponse),
        (status = 404, description = "Bid or tender not found", body = ErrorResponse)
    ),
    tag = "bids"
)]
pub async fn submit_decision(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: QueryParams,
) -> Result<Json<BidView>, ApiError> {
    let bid_id = parse_id(&id)?;
    let bid = state
        .bids
        .submit_decision(bid_id, &params.username(), &params.text("decision"))
        .await?;
    Ok(Json(bid))
}

/// Edit a bid, producing a new version
#[utoipa::path(
    patch,
    path = "/api/bids/{id}/edit",
    params(
        ("id" = String, Path, description = "Bid id"),
        ("username" = String, Query, description = "Caller username")
    ),
    request_body = EditBidRequest,
    responses(
        (status = 200, description = "Bid at its new version", body = BidView),
        (status = 400, description = "Invalid id or body", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Caller is not the bid author", body = ErrorResponse),
        (status = 404, description = "Bid not found", body = ErrorResponse)
    ),
    tag = "bids"
)]
pub async fn edit_bid(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: QueryParams,
    body: Result<Json<EditBidRequest>, JsonRejection>,
) -> Result<Json<BidView>, ApiError> {
    let bid_id = parse_id(&id)?;
    let patch = json_body(body)?.into_patch();
    let bid = state.bids.edit(bid_id, &params.username(), patch).await?;
    Ok(Json(bid))
}

/// Restore an earlier bid version as a new version
#[utoipa::path(
    put,
    path = "/api/bids/{id}/rollback/{version}",
    params(
        ("id" = String, Path, description = "Bid id"),
        ("version" = i32, Path, description = "Version to restore"),
        ("username" = String, Query, description = "Caller username")
    ),
    responses(
        (status = 200, description = "Bid at its new version", body = BidView),
        (status = 400, description = "Invalid id or version", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 403, description = "Caller is not the bid author", body = ErrorResponse),
        (status = 404, description = "Bid or version not found", body = ErrorResponse)
    ),
    tag = "bids"
)]
pub async fn rollback_bid(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
    params: QueryParams,
) -> Result<Json<BidView>, ApiError> {
    let bid_id = parse_id(&id)?;
    let version = parse_version(&version)?;
    let bid = state
        .bids
        .rollback(bid_id, &params.username(), version)
        .await?;
    Ok(Json(bid))
}
