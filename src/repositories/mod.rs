//! # Repository Layer
//!
//! Data access for the marketplace: identity and authorization lookups, and
//! the versioned tender and bid stores.

use sea_orm::DbErr;

pub mod bid;
pub mod identity;
pub mod tender;
pub mod versioned;

pub use bid::{BidFilter, BidPatch, BidRepository, NewBid};
pub use identity::IdentityRepository;
pub use tender::{NewTender, TenderFilter, TenderPatch, TenderRepository};
pub use versioned::{MAX_PAGE_VALUE, MAX_VERSION_ATTEMPTS, Page, VersionedStore};

/// Reads a row count as a yes/no answer, treating storage errors as "no".
pub(crate) fn fail_closed(context: &str, result: Result<u64, DbErr>) -> bool {
    match result {
        Ok(count) => count > 0,
        Err(error) => {
            tracing::warn!(error = ?error, "{context}");
            false
        }
    }
}
