//! Identity and authorization lookups.
//!
//! Boolean predicates are fail-closed: a storage error is logged and read as
//! "not permitted", never surfaced as an internal error.

use std::sync::Arc;

use sea_orm::sea_query::Query;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use super::fail_closed;
use crate::error::MarketError;
use crate::models::{bid, employee, organization_responsible, tender};

/// Resolves employees and answers "may this user act on that entity".
#[derive(Debug, Clone)]
pub struct IdentityRepository {
    db: Arc<DatabaseConnection>,
}

impl IdentityRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Resolves a username to the employee id.
    pub async fn resolve_user(&self, username: &str) -> Result<Uuid, MarketError> {
        match employee::Entity::find()
            .filter(employee::Column::Username.eq(username))
            .one(&*self.db)
            .await
        {
            Ok(Some(found)) => Ok(found.id),
            Ok(None) => Err(MarketError::UserNotFound),
            Err(error) => {
                tracing::error!(error = ?error, username, "Failed to resolve user");
                Err(MarketError::UserNotFound)
            }
        }
    }

    pub async fn user_exists(&self, user_id: Uuid) -> bool {
        let result = employee::Entity::find_by_id(user_id).count(&*self.db).await;
        fail_closed("Failed to check employee existence", result)
    }

    pub async fn is_responsible_for(&self, user_id: Uuid, organization_id: Uuid) -> bool {
        let result = organization_responsible::Entity::find()
            .filter(organization_responsible::Column::UserId.eq(user_id))
            .filter(organization_responsible::Column::OrganizationId.eq(organization_id))
            .count(&*self.db)
            .await;
        fail_closed("Failed to check organization responsibility", result)
    }

    /// True iff the user is responsible for the organization owning the tender.
    pub async fn is_responsible_for_tender_owner(&self, tender_id: Uuid, user_id: Uuid) -> bool {
        let tender_organization = Query::select()
            .column(tender::Column::OrganizationId)
            .from(tender::Entity)
            .and_where(tender::Column::Id.eq(tender_id))
            .to_owned();

        let result = organization_responsible::Entity::find()
            .filter(organization_responsible::Column::UserId.eq(user_id))
            .filter(organization_responsible::Column::OrganizationId.in_subquery(tender_organization))
            .count(&*self.db)
            .await;
        fail_closed("Failed to check tender ownership", result)
    }

    /// Returns the organization the employee is responsible for.
    ///
    /// Employees responsible for several organizations resolve to the lowest
    /// organization id so the answer is stable.
    pub async fn organization_of_employee(&self, employee_id: Uuid) -> Result<Uuid, MarketError> {
        match organization_responsible::Entity::find()
            .filter(organization_responsible::Column::UserId.eq(employee_id))
            .order_by_asc(organization_responsible::Column::OrganizationId)
            .one(&*self.db)
            .await
        {
            Ok(Some(row)) => Ok(row.organization_id),
            Ok(None) => Err(MarketError::NoOrganizationFound),
            Err(error) => {
                tracing::error!(error = ?error, %employee_id, "Failed to look up employee organization");
                Err(MarketError::NoOrganizationFound)
            }
        }
    }

    /// True if the user wrote the bid or may decide on it.
    pub async fn is_bid_visible_to(&self, user_id: Uuid, bid_id: Uuid) -> bool {
        let authored = bid::Entity::find()
            .filter(bid::Column::Id.eq(bid_id))
            .filter(bid::Column::AuthorId.eq(user_id))
            .count(&*self.db)
            .await;
        if fail_closed("Failed to check bid authorship", authored) {
            return true;
        }

        self.can_submit_decision_on(bid_id, user_id).await
    }

    /// True iff the user is responsible for the organization owning the bid's tender.
    pub async fn can_submit_decision_on(&self, bid_id: Uuid, user_id: Uuid) -> bool {
        let bid_tender = Query::select()
            .column(bid::Column::TenderId)
            .from(bid::Entity)
            .and_where(bid::Column::Id.eq(bid_id))
            .to_owned();
        let tender_organization = Query::select()
            .column(tender::Column::OrganizationId)
            .from(tender::Entity)
            .and_where(tender::Column::Id.in_subquery(bid_tender))
            .to_owned();

        let result = organization_responsible::Entity::find()
            .filter(organization_responsible::Column::UserId.eq(user_id))
            .filter(organization_responsible::Column::OrganizationId.in_subquery(tender_organization))
            .count(&*self.db)
            .await;
        fail_closed("Failed to check decision rights", result)
    }

    pub async fn bid_author(&self, bid_id: Uuid) -> Result<Uuid, MarketError> {
        match bid::Entity::find_by_id(bid_id).one(&*self.db).await {
            Ok(Some(found)) => Ok(found.author_id),
            Ok(None) => Err(MarketError::UserNotFound),
            Err(error) => {
                tracing::error!(error = ?error, %bid_id, "Failed to look up bid author");
                Err(MarketError::UserNotFound)
            }
        }
    }
}
