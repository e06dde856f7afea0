//! String-valued domain enums.
//!
//! Values are stored as text; the database CHECK constraints are the final
//! authority, so status updates still accept arbitrary strings and let the
//! store reject unknown ones.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::MarketError;

/// Kind of work a tender asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ServiceType {
    Construction,
    Delivery,
    Manufacture,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [
        ServiceType::Construction,
        ServiceType::Delivery,
        ServiceType::Manufacture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Construction => "Construction",
            ServiceType::Delivery => "Delivery",
            ServiceType::Manufacture => "Manufacture",
        }
    }
}

/// Tender lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TenderStatus {
    Created,
    Published,
    Closed,
}

impl TenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenderStatus::Created => "Created",
            TenderStatus::Published => "Published",
            TenderStatus::Closed => "Closed",
        }
    }
}

/// Bid lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BidStatus {
    Created,
    Published,
    Canceled,
    Approved,
    Rejected,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Created => "Created",
            BidStatus::Published => "Published",
            BidStatus::Canceled => "Canceled",
            BidStatus::Approved => "Approved",
            BidStatus::Rejected => "Rejected",
        }
    }
}

/// Whether a bid was submitted by an employee personally or on behalf of
/// their organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AuthorType {
    Organization,
    User,
}

impl AuthorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorType::Organization => "Organization",
            AuthorType::User => "User",
        }
    }
}

/// Outcome submitted by a responsible employee for a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
        }
    }
}

impl FromStr for ServiceType {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == s)
            .ok_or(MarketError::InvalidAttributeValue)
    }
}

impl FromStr for TenderStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(TenderStatus::Created),
            "Published" => Ok(TenderStatus::Published),
            "Closed" => Ok(TenderStatus::Closed),
            _ => Err(MarketError::InvalidAttributeValue),
        }
    }
}

impl FromStr for BidStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(BidStatus::Created),
            "Published" => Ok(BidStatus::Published),
            "Canceled" => Ok(BidStatus::Canceled),
            "Approved" => Ok(BidStatus::Approved),
            "Rejected" => Ok(BidStatus::Rejected),
            _ => Err(MarketError::InvalidAttributeValue),
        }
    }
}

impl FromStr for AuthorType {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Organization" => Ok(AuthorType::Organization),
            "User" => Ok(AuthorType::User),
            _ => Err(MarketError::InvalidAttributeValue),
        }
    }
}

/// Only the exact strings `Approved` and `Rejected` are decisions.
impl FromStr for Decision {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Approved" => Ok(Decision::Approved),
            "Rejected" => Ok(Decision::Rejected),
            _ => Err(MarketError::WrongDecision),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })+
    };
}

display_as_str!(ServiceType, TenderStatus, BidStatus, AuthorType, Decision);
