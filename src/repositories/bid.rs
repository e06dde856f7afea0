//! Bid store.
//!
//! Same header/version layout as tenders, without a service type. Listing by
//! tender reports query failures as [`MarketError::NoBidsFound`]; listing by
//! author reports them as [`MarketError::Internal`].

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
use crate::models::{AuthorType, BidStatus, BidView, bid, bid_version};

/// Attributes of a new bid.
#[derive(Debug, Clone)]
pub struct NewBid {
    pub name: String,
    pub description: String,
    pub tender_id: Uuid,
    pub author_type: AuthorType,
    pub author_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct BidPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidFilter {
    ByAuthor(Uuid),
    ByTender(Uuid),
}

/// Repository for bid headers and versions
#[derive(Debug, Clone)]
pub struct BidRepository {
    db: Arc<DatabaseConnection>,
}

impl BidRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get_status(&self, id: Uuid) -> Result<String, MarketError> {
        match bid::Entity::find_by_id(id).one(&*self.db).await {
            Ok(Some(found)) => Ok(found.status),
            Ok(None) => Err(MarketError::BidNotFound),
            Err(error) => Err(map_db_err(
                "Failed to read bid status",
                error,
                MarketError::BidNotFound,
            )),
        }
    }

    async fn append_edit(&self, id: Uuid, patch: &BidPatch) -> Result<(), AppendError> {
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

fn current_bids() -> Select<bid_version::Entity> {
    let max_version = Query::select()
        .expr(Expr::col((Alias::new("latest"), bid_version::Column::Version)).max())
        .from_as(bid_version::Entity, Alias::new("latest"))
        .and_where(
            Expr::col((Alias::new("latest"), bid_version::Column::BidId))
                .equals((bid_version::Entity, bid_version::Column::BidId)),
        )
        .to_owned();

    bid_version::Entity::find()
        .select_only()
        .column_as(bid::Column::Id, "id")
        .column_as(bid_version::Column::Name, "name")
        .column_as(bid_version::Column::Description, "description")
        .column_as(bid::Column::Status, "status")
        .column_as(bid::Column::TenderId, "tender_id")
        .column_as(bid::Column::AuthorType, "author_type")
        .column_as(bid::Column::AuthorId, "author_id")
        .column_as(bid_version::Column::Version, "version")
        .column_as(bid::Column::CreatedAt, "created_at")
        .join(JoinType::InnerJoin, bid_version::Relation::Bid.def())
        .filter(bid_version::Column::Version.in_subquery(max_version))
}

async fn latest_version(
    txn: &DatabaseTransaction,
    id: Uuid,
) -> Result<bid_version::Model, AppendError> {
    bid_version::Entity::find()
        .filter(bid_version::Column::BidId.eq(id))
        .order_by_desc(bid_version::Column::Version)
        .one(txn)
        .await?
        .ok_or(AppendError::Domain(MarketError::BidNotFound))
}

async fn insert_version(
    txn: &DatabaseTransaction,
    id: Uuid,
    version: i32,
    name: String,
    description: String,
) -> Result<(), AppendError> {
    let row = bid_version::ActiveModel {
        id: Set(Uuid::new_v4()),
        bid_id: Set(id),
        name: Set(name),
        description: Set(description),
        version: Set(version),
        created_at: Set(now()),
    };
    bid_version::Entity::insert(row)
        .exec_without_returning(txn)
        .await?;
    Ok(())
}

async fn insert_bid(txn: &DatabaseTransaction, id: Uuid, new: &NewBid) -> Result<(), AppendError> {
    let header = bid::ActiveModel {
        id: Set(id),
        tender_id: Set(new.tender_id),
        author_type: Set(new.author_type.as_str().to_string()),
        author_id: Set(new.author_id),
        status: Set(BidStatus::Created.as_str().to_string()),
        created_at: Set(now()),
    };
    bid::Entity::insert(header).exec_without_returning(txn).await?;

    insert_version(txn, id, 1, new.name.clone(), new.description.clone()).await
}

async fn append_edit_in(
    txn: &DatabaseTransaction,
    id: Uuid,
    patch: &BidPatch,
) -> Result<(), AppendError> {
    let latest = latest_version(txn, id).await?;
    insert_version(
        txn,
        id,
        latest.version + 1,
        patched(&latest.name, patch.name.as_ref()),
        patched(&latest.description, patch.description.as_ref()),
    )
    .await
}

async fn append_rollback_in(
    txn: &DatabaseTransaction,
    id: Uuid,
    version: i32,
) -> Result<(), AppendError> {
    let latest = latest_version(txn, id).await?;
    let target = bid_version::Entity::find()
        .filter(bid_version::Column::BidId.eq(id))
        .filter(bid_version::Column::Version.eq(version))
        .one(txn)
        .await?
        .ok_or(AppendError::Domain(MarketError::NoSuchVersion))?;

    insert_version(
        txn,
        id,
        latest.version + 1,
        target.name,
        target.description,
    )
    .await
}

#[async_trait]
impl VersionedStore for BidRepository {
    type Record = BidView;
    type NewRecord = NewBid;
    type Patch = BidPatch;
    type Filter = BidFilter;

    async fn create(&self, new: NewBid) -> Result<BidView, MarketError> {
        let id = Uuid::new_v4();
        let txn = self.db.begin().await.map_err(|error| {
            map_db_err("Failed to start bid transaction", error, MarketError::Internal)
        })?;

        let result = insert_bid(&txn, id, &new).await;
        finish_txn(txn, result)
            .await
            .map_err(|error| error.into_internal("Failed to create bid"))?;

        tracing::info!(bid_id = %id, tender_id = %new.tender_id, "Created bid");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<BidView, MarketError> {
        match current_bids()
            .filter(bid::Column::Id.eq(id))
            .into_model::<BidView>()
            .one(&*self.db)
            .await
        {
            Ok(Some(view)) => Ok(view),
            Ok(None) => Err(MarketError::BidNotFound),
            Err(error) => Err(map_db_err(
                "Failed to load bid",
                error,
                MarketError::BidNotFound,
            )),
        }
    }

    async fn exists(&self, id: Uuid) -> bool {
        let result = bid::Entity::find_by_id(id).count(&*self.db).await;
        fail_closed("Failed to check bid existence", result)
    }

    async fn has_version(&self, id: Uuid, version: i32) -> Result<bool, MarketError> {
        bid_version::Entity::find()
            .filter(bid_version::Column::BidId.eq(id))
            .filter(bid_version::Column::Version.eq(version))
            .count(&*self.db)
            .await
            .map(|count| count > 0)
            .map_err(|error| {
                map_db_err("Failed to check bid version", error, MarketError::Internal)
            })
    }

    async fn edit(&self, id: Uuid, patch: BidPatch) -> Result<BidView, MarketError> {
        let patch = &patch;
        retry_on_version_conflict("bid", id, move || self.append_edit(id, patch)).await?;
        self.get_by_id(id).await
    }

    async fn rollback(&self, id: Uuid, version: i32) -> Result<BidView, MarketError> {
        retry_on_version_conflict("bid", id, move || self.append_rollback(id, version)).await?;
        tracing::info!(bid_id = %id, from_version = version, "Rolled back bid");
        self.get_by_id(id).await
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<BidView, MarketError> {
        let result = bid::Entity::update_many()
            .col_expr(bid::Column::Status, Expr::value(status))
            .filter(bid::Column::Id.eq(id))
            .exec(&*self.db)
            .await;

        match result {
            Ok(updated) if updated.rows_affected == 0 => Err(MarketError::BidNotFound),
            Ok(_) => self.get_by_id(id).await,
            Err(error) if is_check_violation(&error) => {
                tracing::debug!(bid_id = %id, status, "Rejected bid status");
                Err(MarketError::InvalidAttributeValue)
            }
            Err(error) => Err(map_db_err(
                "Failed to update bid status",
                error,
                MarketError::Internal,
            )),
        }
    }

    async fn list(&self, filter: BidFilter, page: Page) -> Result<Vec<BidView>, MarketError> {
        let (query, fallback) = match filter {
            BidFilter::ByAuthor(author_id) => (
                current_bids().filter(bid::Column::AuthorId.eq(author_id)),
                MarketError::Internal,
            ),
            BidFilter::ByTender(tender_id) => (
                current_bids().filter(bid::Column::TenderId.eq(tender_id)),
                MarketError::NoBidsFound,
            ),
        };

        let page = page.bounded();
        query
            .order_by_asc(bid_version::Column::Name)
            .order_by_asc(bid::Column::Id)
            .limit(page.limit)
            .offset(page.offset)
            .into_model::<BidView>()
            .all(&*self.db)
            .await
            .map_err(|error| map_db_err("Failed to list bids", error, fallback))
    }
}
