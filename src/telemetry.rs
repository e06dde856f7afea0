//! Telemetry utilities: global subscriber setup and per-request correlation.
//!
//! Every inbound request gets a fresh request id. The id is stored in the
//! request extensions, carried by the request span, readable through
//! [`current_request_id`] for the lifetime of the request task, and echoed in
//! the `X-Request-Id` response header.

use std::any::type_name_of_val;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use log::LevelFilter;
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::task_local;
use tracing::Instrument;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::Layer,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};
use uuid::Uuid;

use crate::config::AppConfig;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request-scoped correlation data.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn generate() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

task_local! {
    static ACTIVE_REQUEST_CONTEXT: RequestContext;
}

/// Errors that can occur while initializing global telemetry.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install log tracer bridge: {0}")]
    LogTracer(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize global tracing/logging exactly once, wiring `log::` macros into the tracing pipeline.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TELEMETRY_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    // Install log bridge first so sqlx and `log::` macros route through tracing.
    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        let logger_type = type_name_of_val(log::logger());
        if !logger_type.contains("LogTracer") {
            eprintln!(
                "Warning: Failed to install log tracer bridge: {}. `log::` macros will not emit structured tracing events.",
                err
            );
        }
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        _ => fmt::layer().json().boxed(),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst);
        eprintln!(
            "Warning: Failed to set global tracing subscriber: {}. Default subscriber remains in effect.",
            err
        );
    }

    Ok(())
}

/// Execute `future` with `context` available through [`current_request_id`].
pub async fn with_request_context<Fut, R>(context: RequestContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    ACTIVE_REQUEST_CONTEXT.scope(context, future).await
}

/// Get the id of the request the running task is serving, if any.
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.request_id.clone())
        .ok()
}

/// Axum middleware assigning a [`RequestContext`] and logging the request.
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let context = RequestContext::generate();
    request.extensions_mut().insert(context.clone());

    let method = request.method().clone();
    let uri = request.uri().clone();
    let span = tracing::info_span!(
        "request",
        request_id = %context.request_id,
        method = %method,
        uri = %uri,
    );
    let request_id = context.request_id.clone();
    let method_label = method.to_string();
    let started = Instant::now();

    let mut response = with_request_context(
        context,
        async move {
            tracing::info!(method = %method, uri = %uri, "new");
            next.run(request).await
        }
        .instrument(span.clone()),
    )
    .await;

    let duration_ms = started.elapsed().as_secs_f64() * 1_000.0;
    let status = response.status().as_u16();
    span.in_scope(|| tracing::info!(status, duration_ms, "response"));

    let metric_labels = vec![
        ("method", method_label),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &metric_labels).increment(1);
    histogram!("http_request_duration_ms").record(duration_ms);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;

    async fn echo_request_id() -> String {
        current_request_id().unwrap_or_default()
    }

    #[test]
    fn request_id_is_absent_outside_a_request() {
        assert!(current_request_id().is_none());
    }

    #[tokio::test]
    async fn middleware_scopes_request_id_and_echoes_header() {
        let app = Router::new()
            .route("/echo", get(echo_request_id))
            .layer(middleware::from_fn(request_context_middleware));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/echo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(Uuid::parse_str(&header).is_ok());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), header);
    }

    #[tokio::test]
    async fn each_request_gets_its_own_id() {
        let app = Router::new()
            .route("/echo", get(echo_request_id))
            .layer(middleware::from_fn(request_context_middleware));

        let mut ids = Vec::new();
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    axum::http::Request::builder()
                        .uri("/echo")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            ids.push(response.headers().get(REQUEST_ID_HEADER).unwrap().clone());
        }

        assert_ne!(ids[0], ids[1]);
    }
}
