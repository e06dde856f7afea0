//! # Data Models
//!
//! SeaORM entities for the marketplace tables, the materialized tender and
//! bid views, and the string-valued domain enums.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod bid;
pub mod bid_version;
pub mod employee;
pub mod enums;
pub mod organization;
pub mod organization_responsible;
pub mod tender;
pub mod tender_version;
pub mod views;

pub use bid::Entity as Bid;
pub use bid_version::Entity as BidVersion;
pub use employee::Entity as Employee;
pub use enums::{AuthorType, BidStatus, Decision, ServiceType, TenderStatus};
pub use organization::Entity as Organization;
pub use organization_responsible::Entity as OrganizationResponsible;
pub use tender::Entity as Tender;
pub use tender_version::Entity as TenderVersion;
pub use views::{BidView, TenderView};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "tender-market".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
