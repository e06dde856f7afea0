//! # Error Handling
//!
//! Domain error kinds for the tender marketplace and their mapping onto HTTP
//! responses. Every response body is the single-field `{"reason": "..."}`
//! document; storage details are logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, RuntimeErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::telemetry::current_request_id;

/// Errors produced by the identity, store and workflow layers.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("user not found")]
    UserNotFound,
    #[error("user is not responsible for any organization")]
    NoOrganizationFound,
    #[error("access denied")]
    NoRights,
    #[error("invalid decision value")]
    WrongDecision,
    #[error("tender not found")]
    TenderNotFound,
    #[error("bid not found")]
    BidNotFound,
    #[error("no bids found")]
    NoBidsFound,
    #[error("invalid attribute value")]
    InvalidAttributeValue,
    #[error("version not found")]
    NoSuchVersion,
    #[error("invalid query parameter value")]
    InvalidQueryParam,
    #[error("invalid request body")]
    InvalidBody,
    #[error("invalid path parameter value")]
    InvalidPathParam,
    #[error("internal error")]
    Internal,
    /// Another error with a human-readable prefix.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<MarketError>,
    },
}

/// Root kind of a [`MarketError`], with context layers stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UserNotFound,
    NoOrganizationFound,
    NoRights,
    WrongDecision,
    TenderNotFound,
    BidNotFound,
    NoBidsFound,
    InvalidAttributeValue,
    NoSuchVersion,
    InvalidQueryParam,
    InvalidBody,
    InvalidPathParam,
    Internal,
}

impl MarketError {
    /// Wraps the error with a prefix while keeping its kind.
    pub fn context(self, context: impl Into<String>) -> Self {
        MarketError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the root error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::UserNotFound => ErrorKind::UserNotFound,
            MarketError::NoOrganizationFound => ErrorKind::NoOrganizationFound,
            MarketError::NoRights => ErrorKind::NoRights,
            MarketError::WrongDecision => ErrorKind::WrongDecision,
            MarketError::TenderNotFound => ErrorKind::TenderNotFound,
            MarketError::BidNotFound => ErrorKind::BidNotFound,
            MarketError::NoBidsFound => ErrorKind::NoBidsFound,
            MarketError::InvalidAttributeValue => ErrorKind::InvalidAttributeValue,
            MarketError::NoSuchVersion => ErrorKind::NoSuchVersion,
            MarketError::InvalidQueryParam => ErrorKind::InvalidQueryParam,
            MarketError::InvalidBody => ErrorKind::InvalidBody,
            MarketError::InvalidPathParam => ErrorKind::InvalidPathParam,
            MarketError::Internal => ErrorKind::Internal,
            MarketError::Context { source, .. } => source.kind(),
        }
    }
}

impl ErrorKind {
    /// HTTP status code used when this kind reaches the delivery layer.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidQueryParam
            | ErrorKind::InvalidBody
            | ErrorKind::InvalidPathParam
            | ErrorKind::InvalidAttributeValue
            | ErrorKind::WrongDecision => StatusCode::BAD_REQUEST,
            ErrorKind::UserNotFound => StatusCode::UNAUTHORIZED,
            ErrorKind::NoRights | ErrorKind::NoOrganizationFound => StatusCode::FORBIDDEN,
            ErrorKind::TenderNotFound
            | ErrorKind::BidNotFound
            | ErrorKind::NoBidsFound
            | ErrorKind::NoSuchVersion => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Logs a storage failure and converts it to `fallback`.
pub fn map_db_err(context: &str, error: DbErr, fallback: MarketError) -> MarketError {
    tracing::error!(error = ?error, "{context}");
    fallback
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable failure reason
    pub reason: String,
}

/// A [`MarketError`] on its way out through axum.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub reason: String,
    /// Id of the request that failed, when raised inside one.
    pub request_id: Option<String>,
}

impl From<MarketError> for ApiError {
    fn from(error: MarketError) -> Self {
        let status = error.kind().status_code();
        let request_id = current_request_id();
        if status.is_server_error() {
            tracing::error!(
                error = %error,
                request_id = request_id.as_deref().unwrap_or("-"),
                "Request failed with internal error"
            );
        } else {
            tracing::debug!(error = %error, status = status.as_u16(), "Request rejected");
        }

        Self {
            status,
            reason: error.to_string(),
            request_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            axum::Json(ErrorResponse {
                reason: self.reason,
            }),
        )
            .into_response()
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

fn database_error(error: &DbErr) -> Option<&(dyn sea_orm::sqlx::error::DatabaseError + 'static)> {
    match error {
        DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err.as_database_error(),
        _ => None,
    }
}

/// True when the database rejected a write because of a unique constraint.
pub fn is_unique_violation(error: &DbErr) -> bool {
    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let Some(db_error) = database_error(error) else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error.code().is_some_and(|code| {
        let code_str = code.as_ref();
        code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str)
    })
}

/// True when the database rejected a value outside a column's domain.
///
/// Postgres reports CHECK failures as `23514` and invalid enum input as
/// `22P02`; SQLite reports `SQLITE_CONSTRAINT_CHECK` (275).
pub fn is_check_violation(error: &DbErr) -> bool {
    const PG_CHECK_CODES: &[&str] = &["23514", "22P02"];
    const SQLITE_CHECK: &str = "275";

    let Some(db_error) = database_error(error) else {
        return false;
    };

    if db_error.is_check_violation() {
        return true;
    }

    db_error.code().is_some_and(|code| {
        let code_str = code.as_ref();
        PG_CHECK_CODES.contains(&code_str) || code_str == SQLITE_CHECK
    })
}
