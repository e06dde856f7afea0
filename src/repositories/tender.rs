//! Tender store.
//!
//! Implements [`VersionedStore`] over the `tender` header and
//! `tender_version` history tables.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use super::fail_closed;
use super::versioned::{
    AppendError, Page, VersionedStore, finish_txn, now, patched, retry_on_version_conflict,
};
use crate::error::{MarketError, is_check_violation, map_db_err};
use crate::models::{ServiceType, TenderStatus, TenderView, bid, tender, tender_version};

/// Attributes of a new tender.
#[derive(Debug, Clone)]
pub struct NewTender {
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub organization_id: Uuid,
    pub author_id: Uuid,
}

/// Partial tender update. Service type stays a string so values outside the
/// column domain reach the database constraint.
#[derive(Debug, Clone, Default)]
pub struct TenderPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenderFilter {
    /// Published tenders, optionally restricted to the given service types.
    Published { service_types: Vec<String> },
    /// Every tender authored by the employee, whatever its status.
    ByAuthor(Uuid),
}

/// Repository for tender headers and versions
#[derive(Debug, Clone)]
pub struct TenderRepository {
    db: Arc<DatabaseConnection>,
}

impl TenderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Reads the header status.
    pub async fn get_status(&self, id: Uuid) -> Result<String, MarketError> {
        match tender::Entity::find_by_id(id).one(&*self.db).await {
            Ok(Some(found)) => Ok(found.status),
            Ok(None) => Err(MarketError::TenderNotFound),
            Err(error) => Err(map_db_err(
                "Failed to read tender status",
                error,
                MarketError::TenderNotFound,
            )),
        }
    }

    /// Closes the tender a bid was submitted against.
    pub async fn close_by_bid(&self, bid_id: Uuid) -> Result<(), MarketError> {
        let bid_tender = Query::select()
            .column(bid::Column::TenderId)
            .from(bid::Entity)
            .and_where(bid::Column::Id.eq(bid_id))
            .to_owned();

        let result = tender::Entity::update_many()
            .col_expr(
                tender::Column::Status,
                Expr::value(TenderStatus::Closed.as_str()),
            )
            .filter(tender::Column::Id.in_subquery(bid_tender))
            .exec(&*self.db)
            .await
            .map_err(|error| {
                map_db_err("Failed to close tender", error, MarketError::TenderNotFound)
            })?;

        if result.rows_affected == 0 {
            return Err(MarketError::TenderNotFound);
        }

        tracing::info!(%bid_id, "Closed tender after bid approval");
        Ok(())
    }

    async fn append_edit(&self, id: Uuid, patch: &TenderPatch) -> Result<(), AppendError> {
        let txn = self.db.begin().await?;
        let result = append_edit_in(&txn, id, patch).await;
        finish_txn(txn, result).await
    }

    async fn append_rollback(&self, id: Uuid, version: i32) -> Result<(), AppendError> {
        let txn = self.db.begin().await?;
        let result = append_rollback_in(&txn, id, version).await;
        finish_txn(txn, result).await
    }
}

/// Header joined with its highest version.
fn current_tenders() -> Select<tender_version::Entity> {
    let max_version = Query::select()
        .expr(Expr::col((Alias::new("latest"), tender_version::Column::Version)).max())
        .from_as(tender_version::Entity, Alias::new("latest"))
        .and_where(
            Expr::col((Alias::new("latest"), tender_version::Column::TenderId))
                .equals((tender_version::Entity, tender_version::Column::TenderId)),
        )
        .to_owned();

    tender_version::Entity::find()
        .select_only()
        .column_as(tender::Column::Id, "id")
        .column_as(tender_version::Column::Name, "name")
        .column_as(tender_version::Column::Description, "description")
        .column_as(tender::Column::Status, "status")
        .column_as(tender_version::Column::ServiceType, "service_type")
        .column_as(tender_version::Column::Version, "version")
        .column_as(tender::Column::CreatedAt, "created_at")
        .join(JoinType::InnerJoin, tender_version::Relation::Tender.def())
        .filter(tender_version::Column::Version.in_subquery(max_version))
}

async fn latest_version(
    txn: &DatabaseTransaction,
    id: Uuid,
) -> Result<tender_version::Model, AppendError> {
    tender_version::Entity::find()
        .filter(tender_version::Column::TenderId.eq(id))
        .order_by_desc(tender_version::Column::Version)
        .one(txn)
        .await?
        .ok_or(AppendError::Domain(MarketError::TenderNotFound))
}

async fn insert_version(
    txn: &DatabaseTransaction,
    id: Uuid,
    version: i32,
    name: String,
    description: String,
    service_type: String,
) -> Result<(), AppendError> {
    let row = tender_version::ActiveModel {
        id: Set(Uuid::new_v4()),
        tender_id: Set(id),
        name: Set(name),
        description: Set(description),
        service_type: Set(service_type),
        version: Set(version),
        created_at: Set(now()),
    };
    tender_version::Entity::insert(row)
        .exec_without_returning(txn)
        .await?;
    Ok(())
}

async fn insert_tender(
    txn: &DatabaseTransaction,
    id: Uuid,
    new: &NewTender,
) -> Result<(), AppendError> {
    let header = tender::ActiveModel {
        id: Set(id),
        organization_id: Set(new.organization_id),
        author_id: Set(new.author_id),
        status: Set(TenderStatus::Created.as_str().to_string()),
        created_at: Set(now()),
    };
    tender::Entity::insert(header)
        .exec_without_returning(txn)
        .await?;

    insert_version(
        txn,
        id,
        1,
        new.name.clone(),
        new.description.clone(),
        new.service_type.as_str().to_string(),
    )
    .await
}

async fn append_edit_in(
    txn: &DatabaseTransaction,
    id: Uuid,
    patch: &TenderPatch,
) -> Result<(), AppendError> {
    let latest = latest_version(txn, id).await?;
    insert_version(
        txn,
        id,
        latest.version + 1,
        patched(&latest.name, patch.name.as_ref()),
        patched(&latest.description, patch.description.as_ref()),
        patched(&latest.service_type, patch.service_type.as_ref()),
    )
    .await
}

async fn append_rollback_in(
    txn: &DatabaseTransaction,
    id: Uuid,
    version: i32,
) -> Result<(), AppendError> {
    let latest = latest_version(txn, id).await?;
    let target = tender_version::Entity::find()
        .filter(tender_version::Column::TenderId.eq(id))
        .filter(tender_version::Column::Version.eq(version))
        .one(txn)
        .await?
        .ok_or(AppendError::Domain(MarketError::NoSuchVersion))?;

    insert_version(
        txn,
        id,
        latest.version + 1,
        target.name,
        target.description,
        target.service_type,
    )
    .await
}

#[async_trait]
impl VersionedStore for TenderRepository {
    type Record = TenderView;
    type NewRecord = NewTender;
    type Patch = TenderPatch;
    type Filter = TenderFilter;

    async fn create(&self, new: NewTender) -> Result<TenderView, MarketError> {
        let id = Uuid::new_v4();
        let txn = self.db.begin().await.map_err(|error| {
            map_db_err(
                "Failed to start tender transaction",
                error,
                MarketError::Internal,
            )
        })?;

        let result = insert_tender(&txn, id, &new).await;
        finish_txn(txn, result)
            .await
            .map_err(|error| error.into_internal("Failed to create tender"))?;

        tracing::info!(tender_id = %id, organization_id = %new.organization_id, "Created tender");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<TenderView, MarketError> {
        match current_tenders()
            .filter(tender::Column::Id.eq(id))
            .into_model::<TenderView>()
            .one(&*self.db)
            .await
        {
            Ok(Some(view)) => Ok(view),
            Ok(None) => Err(MarketError::TenderNotFound),
            Err(error) => Err(map_db_err(
                "Failed to load tender",
                error,
                MarketError::TenderNotFound,
            )),
        }
    }

    async fn exists(&self, id: Uuid) -> bool {
        let result = tender::Entity::find_by_id(id).count(&*self.db).await;
        fail_closed("Failed to check tender existence", result)
    }

    async fn has_version(&self, id: Uuid, version: i32) -> Result<bool, MarketError> {
        tender_version::Entity::find()
            .filter(tender_version::Column::TenderId.eq(id))
            .filter(tender_version::Column::Version.eq(version))
            .count(&*self.db)
            .await
            .map(|count| count > 0)
            .map_err(|error| {
                map_db_err("Failed to check tender version", error, MarketError::Internal)
            })
    }

    async fn edit(&self, id: Uuid, patch: TenderPatch) -> Result<TenderView, MarketError> {
        let patch = &patch;
        retry_on_version_conflict("tender", id, move || self.append_edit(id, patch)).await?;
        self.get_by_id(id).await
    }

    async fn rollback(&self, id: Uuid, version: i32) -> Result<TenderView, MarketError> {
        retry_on_version_conflict("tender", id, move || self.append_rollback(id, version)).await?;
        tracing::info!(tender_id = %id, from_version = version, "Rolled back tender");
        self.get_by_id(id).await
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<TenderView, MarketError> {
        let result = tender::Entity::update_many()
            .col_expr(tender::Column::Status, Expr::value(status))
            .filter(tender::Column::Id.eq(id))
            .exec(&*self.db)
            .await;

        match result {
            Ok(updated) if updated.rows_affected == 0 => Err(MarketError::TenderNotFound),
            Ok(_) => self.get_by_id(id).await,
            Err(error) if is_check_violation(&error) => {
                tracing::debug!(tender_id = %id, status, "Rejected tender status");
                Err(MarketError::InvalidAttributeValue)
            }
            Err(error) => Err(map_db_err(
                "Failed to update tender status",
                error,
                MarketError::Internal,
            )),
        }
    }

    async fn list(&self, filter: TenderFilter, page: Page) -> Result<Vec<TenderView>, MarketError> {
        let query = match filter {
            TenderFilter::Published { service_types } => {
                let query = current_tenders()
                    .filter(tender::Column::Status.eq(TenderStatus::Published.as_str()));
                if service_types.is_empty() {
                    query
                } else {
                    query.filter(tender_version::Column::ServiceType.is_in(service_types))
                }
            }
            TenderFilter::ByAuthor(author_id) => {
                current_tenders().filter(tender::Column::AuthorId.eq(author_id))
            }
        };

        let page = page.bounded();
        query
            .order_by_asc(tender_version::Column::Name)
            .order_by_asc(tender::Column::Id)
            .limit(page.limit)
            .offset(page.offset)
            .into_model::<TenderView>()
            .all(&*self.db)
            .await
            .map_err(|error| map_db_err("Failed to list tenders", error, MarketError::Internal))
    }
}
