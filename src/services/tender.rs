//! Tender workflow.

use tracing::instrument;
use uuid::Uuid;

use crate::error::MarketError;
use crate::models::{ServiceType, TenderView};
use crate::repositories::{
    IdentityRepository, NewTender, Page, TenderFilter, TenderPatch, TenderRepository,
    VersionedStore,
};

/// Input for [`TenderService::create`].
#[derive(Debug, Clone)]
pub struct CreateTenderInput {
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub organization_id: Uuid,
    pub creator_username: String,
}

#[derive(Debug, Clone)]
pub struct TenderService {
    identity: IdentityRepository,
    tenders: TenderRepository,
}

impl TenderService {
    pub fn new(identity: IdentityRepository, tenders: TenderRepository) -> Self {
        Self { identity, tenders }
    }

    /// Creates a tender owned by an organization the creator is responsible for.
    #[instrument(skip_all, fields(organization_id = %input.organization_id))]
    pub async fn create(&self, input: CreateTenderInput) -> Result<TenderView, MarketError> {
        let author_id = self.identity.resolve_user(&input.creator_username).await?;
        if !self
            .identity
            .is_responsible_for(author_id, input.organization_id)
            .await
        {
            return Err(MarketError::NoRights);
        }

        self.tenders
            .create(NewTender {
                name: input.name,
                description: input.description,
                service_type: input.service_type,
                organization_id: input.organization_id,
                author_id,
            })
            .await
    }

    /// Public listing of published tenders. An empty `service_types` means
    /// every type.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        service_types: Vec<String>,
        page: Page,
    ) -> Result<Vec<TenderView>, MarketError> {
        self.tenders
            .list(TenderFilter::Published { service_types }, page)
            .await
    }

    /// Every tender the user authored, whatever its status.
    #[instrument(skip(self))]
    pub async fn list_mine(&self, username: &str, page: Page) -> Result<Vec<TenderView>, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        self.tenders.list(TenderFilter::ByAuthor(user_id), page).await
    }

    /// Reads the status before checking rights, so a denied caller still
    /// learns whether the tender exists.
    #[instrument(skip(self))]
    pub async fn get_status(&self, tender_id: Uuid, username: &str) -> Result<String, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        let status = self.tenders.get_status(tender_id).await?;
        if !self
            .identity
            .is_responsible_for_tender_owner(tender_id, user_id)
            .await
        {
            return Err(MarketError::NoRights);
        }
        Ok(status)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        tender_id: Uuid,
        username: &str,
        status: &str,
    ) -> Result<TenderView, MarketError> {
        let user_id = self.authorize(tender_id, username).await?;
        let updated = self.tenders.update_status(tender_id, status).await?;
        tracing::info!(%tender_id, %user_id, status, "Updated tender status");
        Ok(updated)
    }

    #[instrument(skip(self, patch))]
    pub async fn edit(
        &self,
        tender_id: Uuid,
        username: &str,
        patch: TenderPatch,
    ) -> Result<TenderView, MarketError> {
        self.authorize(tender_id, username).await?;
        self.tenders.edit(tender_id, patch).await
    }

    /// Rights are checked after the version, before the store call.
    #[instrument(skip(self))]
    pub async fn rollback(
        &self,
        tender_id: Uuid,
        username: &str,
        version: i32,
    ) -> Result<TenderView, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        if !self.tenders.exists(tender_id).await {
            return Err(MarketError::TenderNotFound);
        }
        if !self.tenders.has_version(tender_id, version).await? {
            return Err(MarketError::NoSuchVersion);
        }
        if !self
            .identity
            .is_responsible_for_tender_owner(tender_id, user_id)
            .await
        {
            return Err(MarketError::NoRights);
        }
        self.tenders.rollback(tender_id, version).await
    }

    /// Resolves the user, requires the tender, then requires responsibility.
    async fn authorize(&self, tender_id: Uuid, username: &str) -> Result<Uuid, MarketError> {
        let user_id = self.identity.resolve_user(username).await?;
        if !self.tenders.exists(tender_id).await {
            return Err(MarketError::TenderNotFound);
        }
        if !self
            .identity
            .is_responsible_for_tender_owner(tender_id, user_id)
            .await
        {
            return Err(MarketError::NoRights);
        }
        Ok(user_id)
    }
}
