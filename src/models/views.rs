//! Materialized views returned to callers.
//!
//! A view is the entity header joined with its highest-numbered version row.

use sea_orm::FromQueryResult;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Current state of a tender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(as = Tender)]
pub struct TenderView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    pub service_type: String,
    pub version: i32,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

/// Current state of a bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(as = Bid)]
pub struct BidView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    pub tender_id: Uuid,
    pub author_type: String,
    pub author_id: Uuid,
    pub version: i32,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}
