//! # Common API Types
//!
//! Query-string, path and body parsing shared by the tender and bid
//! handlers. Parsing failures surface as the parsing-layer error kinds.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{FromRequestParts, rejection::JsonRejection},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::MarketError;
use crate::models::{AuthorType, ServiceType};
use crate::repositories::{BidPatch, Page, TenderPatch};

/// Decoded query string, preserving repeated keys in order.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        Self { pairs }
    }

    /// First value for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Every value for `key`, in request order.
    pub fn all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// First value for `key`, or an empty string when absent.
    pub fn text(&self, key: &str) -> String {
        self.first(key).unwrap_or_default().to_string()
    }

    pub fn username(&self) -> String {
        self.text("username")
    }

    /// Reads `limit` and `offset`, falling back to `defaults` for absent keys.
    pub fn page(&self, defaults: Page) -> Result<Page, MarketError> {
        let limit = parse_count(self.first("limit"), defaults.limit)?;
        let offset = parse_count(self.first("offset"), defaults.offset)?;
        Ok(Page::new(limit, offset))
    }
}

/// Accepts integers in `0..=i64::MAX`, the range SQL `LIMIT`/`OFFSET` bind.
fn parse_count(raw: Option<&str>, default: u64) -> Result<u64, MarketError> {
    let Some(value) = raw else {
        return Ok(default);
    };
    let count = value
        .parse::<i64>()
        .map_err(|_| MarketError::InvalidQueryParam)?;
    u64::try_from(count).map_err(|_| MarketError::InvalidQueryParam)
}

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::parse(parts.uri.query()))
    }
}

pub fn parse_id(raw: &str) -> Result<Uuid, MarketError> {
    Uuid::parse_str(raw).map_err(|_| MarketError::InvalidPathParam)
}

pub fn parse_version(raw: &str) -> Result<i32, MarketError> {
    raw.parse::<i32>().map_err(|_| MarketError::InvalidPathParam)
}

/// Unwraps a JSON body, reporting any decoding failure as `InvalidBody`.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, MarketError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected request body");
            Err(MarketError::InvalidBody)
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenderRequest {
    #[schema(example = "Office renovation")]
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub organization_id: Uuid,
    #[schema(example = "user1")]
    pub creator_username: String,
}

/// Fields to change; absent or empty fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditTenderRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<String>,
}

impl EditTenderRequest {
    pub fn into_patch(self) -> TenderPatch {
        TenderPatch {
            name: non_empty(self.name),
            description: non_empty(self.description),
            service_type: non_empty(self.service_type),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBidRequest {
    pub name: String,
    pub description: String,
    pub tender_id: Uuid,
    pub author_type: AuthorType,
    pub author_id: Uuid,
}

/// Fields to change; absent or empty fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditBidRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl EditBidRequest {
    pub fn into_patch(self) -> BidPatch {
        BidPatch {
            name: non_empty(self.name),
            description: non_empty(self.description),
        }
    }
}
