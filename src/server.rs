//! # Server Configuration
//!
//! Router assembly, OpenAPI document and the serve loop with graceful
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers::{self, bids, tenders};
use crate::repositories::Page;
use crate::services::{BidService, TenderService, build_services};
use crate::telemetry::request_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub tenders: TenderService,
    pub bids: BidService,
    /// Pagination applied when a request omits `limit` or `offset`.
    pub default_page: Page,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, default_page: Page) -> Self {
        let (tenders, bids) = build_services(db);
        Self {
            tenders,
            bids,
            default_page,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/ping", get(handlers::ping))
        .route("/api/tenders", get(tenders::list_tenders))
        .route("/api/tenders/new", post(tenders::create_tender))
        .route("/api/tenders/my", get(tenders::my_tenders))
        .route(
            "/api/tenders/{id}/status",
            get(tenders::tender_status).put(tenders::update_tender_status),
        )
        .route("/api/tenders/{id}/edit", patch(tenders::edit_tender))
        .route(
            "/api/tenders/{id}/rollback/{version}",
            put(tenders::rollback_tender),
        )
        .route("/api/bids/new", post(bids::create_bid))
        .route("/api/bids/my", get(bids::my_bids))
        .route("/api/bids/{id}/list", get(bids::tender_bids))
        .route(
            "/api/bids/{id}/status",
            get(bids::bid_status).put(bids::update_bid_status),
        )
        .route("/api/bids/{id}/submit_decision", put(bids::submit_decision))
        .route("/api/bids/{id}/edit", patch(bids::edit_bid))
        .route("/api/bids/{id}/rollback/{version}", put(bids::rollback_bid))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves the API until SIGINT or SIGTERM, then drains in-flight requests
/// for at most `shutdown_timeout_seconds`.
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let default_page = Page::new(config.default_page_limit, config.default_page_offset);
    let app = create_app(AppState::new(Arc::new(db), default_page));

    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    let shutdown = CancellationToken::new();
    let drain = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain.cancelled().await })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            joined??;
            return Ok(());
        }
        signal = wait_for_shutdown() => signal?,
    }

    shutdown.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_seconds);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            timeout_seconds = config.shutdown_timeout_seconds,
            "Graceful shutdown timed out; abandoning in-flight requests"
        ),
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn wait_for_shutdown() -> std::io::Result<()> {
    tokio::select! {
        result = signal::ctrl_c() => result?,
        result = wait_sigterm() => result?,
    }
    tracing::info!("Shutdown signal received, initiating graceful shutdown");
    Ok(())
}

#[cfg(unix)]
async fn wait_sigterm() -> std::io::Result<()> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_sigterm() -> std::io::Result<()> {
    std::future::pending().await
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::ping,
        crate::handlers::tenders::list_tenders,
        crate::handlers::tenders::create_tender,
        crate::handlers::tenders::my_tenders,
        crate::handlers::tenders::tender_status,
        crate::handlers::tenders::update_tender_status,
        crate::handlers::tenders::edit_tender,
        crate::handlers::tenders::rollback_tender,
        crate::handlers::bids::create_bid,
        crate::handlers::bids::my_bids,
        crate::handlers::bids::tender_bids,
        crate::handlers::bids::bid_status,
        crate::handlers::bids::update_bid_status,
        crate::handlers::bids::submit_decision,
        crate::handlers::bids::edit_bid,
        crate::handlers::bids::rollback_bid,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::TenderView,
            crate::models::BidView,
            crate::models::ServiceType,
            crate::models::TenderStatus,
            crate::models::BidStatus,
            crate::models::AuthorType,
            crate::error::ErrorResponse,
            crate::handlers::types::CreateTenderRequest,
            crate::handlers::types::EditTenderRequest,
            crate::handlers::types::CreateBidRequest,
            crate::handlers::types::EditBidRequest,
        )
    ),
    tags(
        (name = "tenders", description = "Tender lifecycle and versioning"),
        (name = "bids", description = "Bids, decisions and versioning"),
    ),
    info(
        title = "Tender Market API",
        description = "Tender marketplace with versioned tenders and bids",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
