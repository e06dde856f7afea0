//! # Workflows
//!
//! Tender and bid workflows: resolve the caller, check their rights against
//! the organization-responsibility graph, then delegate to the versioned
//! stores. The order of checks in each operation decides which error a
//! caller sees first and is part of the contract.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub mod bid;
pub mod tender;

pub use bid::{BidService, CreateBidInput};
pub use tender::{CreateTenderInput, TenderService};

use crate::repositories::{BidRepository, IdentityRepository, TenderRepository};

/// Builds both workflows over one connection pool.
pub fn build_services(db: Arc<DatabaseConnection>) -> (TenderService, BidService) {
    let identity = IdentityRepository::new(db.clone());
    let tenders = TenderRepository::new(db.clone());
    let bids = BidRepository::new(db);

    (
        TenderService::new(identity.clone(), tenders.clone()),
        BidService::new(identity, tenders, bids),
    )
}
