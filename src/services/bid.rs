//! Bid workflow, including the approve/reject decision.

use tracing::instrument;
use uuid::Uuid;

use crate::error::MarketError;
use crate::models::{AuthorType, BidStatus, BidView, Decision, TenderStatus};
use crate::repositories::{
    BidFilter, BidPatch, BidRepository, IdentityRepository, NewBid, Page, TenderRepository,
    VersionedStore,
};

/// Input for [`BidService::create`].
#[derive(Debug, Clone)]
pub struct CreateBidInput {
    pub name: String,
    pub description: String,
    pub tender_id: Uuid,
    pub author_type: AuthorType,
    pub author_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct BidService {
    identity: IdentityRepository,
    tenders: TenderRepository,
    bids: BidRepository,
}

impl BidService {
    pub fn new(
        identity: IdentityRepository,
        tenders: TenderRepository,
        bids: BidRepository,
    ) -> Self {
        Self {
            identity,
            tenders,
            bids,
        }
    }

    /// Submits a bid against a published tender.
    #[instrument(skip_all, fields(tender_id = %input.tender_id, author_id = %input.author_id))]
    pub async fn create(&self, input: CreateBidInput) -> Result<BidView, MarketError> {
        if !self.identity.user_exists(input.author_id).await {
            return Err(MarketError::UserNotFound);
        }

        if input.author_type == AuthorType::Organization {
            self.identity
                .organization_of_employee(input.author_id)
                .await
                .map_err(|error| error.context("bid author represents no organization"))?;
        }

        let tender_status = self.tenders.get_status(input.tender_id).await?;
        if tender_status != TenderStatus::Published.as_str() {
            return Err(MarketError::NoRights.context("tender is not published"));
        }

        self.bids
            .create(NewBid {
                name: input.name,
                description: input.description,
                tender_id: input.tender_id,
                author_type: input.author_type,
                author_id: input.author_id,
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_mine(&self, username: &str, page: Page) -> Result<Vec<BidView>, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        self.bids.list(BidFilter::ByAuthor(user_id), page).await
    }

    /// Bids are fetched before the rights check; a store failure is reported
    /// as [`MarketError::NoBidsFound`] even for callers without rights.
    #[instrument(skip(self))]
    pub async fn list_for_tender(
        &self,
        tender_id: Uuid,
        username: &str,
        page: Page,
    ) -> Result<Vec<BidView>, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        if !self.tenders.exists(tender_id).await {
            return Err(MarketError::TenderNotFound);
        }

        let bids = self.bids.list(BidFilter::ByTender(tender_id), page).await?;

        if !self
            .identity
            .is_responsible_for_tender_owner(tender_id, user_id)
            .await
        {
            return Err(MarketError::NoRights);
        }
        Ok(bids)
    }

    #[instrument(skip(self))]
    pub async fn get_status(&self, bid_id: Uuid, username: &str) -> Result<String, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        let status = self.bids.get_status(bid_id).await?;
        if !self.identity.is_bid_visible_to(user_id, bid_id).await {
            return Err(MarketError::NoRights);
        }
        Ok(status)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        bid_id: Uuid,
        username: &str,
        status: &str,
    ) -> Result<BidView, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        if !self.bids.exists(bid_id).await {
            return Err(MarketError::BidNotFound);
        }
        if !self.identity.is_bid_visible_to(user_id, bid_id).await {
            return Err(MarketError::NoRights);
        }
        self.bids.update_status(bid_id, status).await
    }

    /// `Approved` closes the parent tender and leaves the bid's own status
    /// untouched; `Rejected` cancels the bid.
    #[instrument(skip(self))]
    pub async fn submit_decision(
        &self,
        bid_id: Uuid,
        username: &str,
        decision: &str,
    ) -> Result<BidView, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        if !self.identity.can_submit_decision_on(bid_id, user_id).await {
            return Err(MarketError::NoRights);
        }

        match decision.parse::<Decision>()? {
            Decision::Approved => {
                self.tenders.close_by_bid(bid_id).await?;
                tracing::info!(%bid_id, %user_id, "Bid approved");
                self.bids.get_by_id(bid_id).await
            }
            Decision::Rejected => {
                let bid = self
                    .bids
                    .update_status(bid_id, BidStatus::Canceled.as_str())
                    .await?;
                tracing::info!(%bid_id, %user_id, "Bid rejected");
                Ok(bid)
            }
        }
    }

    /// Only the bid's author may edit it.
    #[instrument(skip(self, patch))]
    pub async fn edit(
        &self,
        bid_id: Uuid,
        username: &str,
        patch: BidPatch,
    ) -> Result<BidView, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        if !self.bids.exists(bid_id).await {
            return Err(MarketError::BidNotFound);
        }
        self.require_author(bid_id, user_id).await?;
        self.bids.edit(bid_id, patch).await
    }

    #[instrument(skip(self))]
    pub async fn rollback(
        &self,
        bid_id: Uuid,
        username: &str,
        version: i32,
    ) -> Result<BidView, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        if !self.bids.exists(bid_id).await {
            return Err(MarketError::BidNotFound);
        }
        if !self.bids.has_version(bid_id, version).await? {
            return Err(MarketError::NoSuchVersion);
        }
        self.require_author(bid_id, user_id).await?;
        self.bids.rollback(bid_id, version).await
    }

    async fn require_author(&self, bid_id: Uuid, user_id: Uuid) -> Result<(), MarketError> {
        let author_id = self.identity.bid_author(bid_id).await?;
        if author_id != user_id {
            return Err(MarketError::NoRights);
        }
        Ok(())
    }
}
