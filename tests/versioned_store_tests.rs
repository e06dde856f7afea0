//! Store-level tests for version numbering and constraint mapping.

mod test_utils;

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tender_market::error::{MarketError, is_check_violation, is_unique_violation};
use tender_market::models::{AuthorType, ServiceType, bid, tender, tender_version};
use tender_market::repositories::{
    BidFilter, BidRepository, NewBid, NewTender, Page, TenderFilter, TenderPatch,
    TenderRepository, VersionedStore,
};
use test_utils::{seed_marketplace, setup_test_db_arc};
use uuid::Uuid;

async fn store_with_tender() -> (Arc<sea_orm::DatabaseConnection>, TenderRepository, Uuid) {
    let db = setup_test_db_arc().await.unwrap();
    let market = seed_marketplace(&db).await.unwrap();
    let store = TenderRepository::new(db.clone());
    let created = store
        .create(NewTender {
            name: "Road".to_string(),
            description: "Resurface the road".to_string(),
            service_type: ServiceType::Construction,
            organization_id: market.organization_id,
            author_id: market.owner_id,
        })
        .await
        .unwrap();
    (db, store, created.id)
}

#[tokio::test]
async fn concurrent_edits_get_distinct_consecutive_versions() {
    let (db, store, id) = store_with_tender().await;

    let mut handles = Vec::new();
    for index in 0..4 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .edit(
                    id,
                    TenderPatch {
                        description: Some(format!("Edit {index}")),
                        ..TenderPatch::default()
                    },
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let versions: Vec<i32> = tender_version::Entity::find()
        .filter(tender_version::Column::TenderId.eq(id))
        .order_by_asc(tender_version::Column::Version)
        .all(&*db)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.version)
        .collect();
    assert_eq!(versions, vec![1, 2, 3, 4, 5]);

    assert_eq!(store.get_by_id(id).await.unwrap().version, 5);
}

#[tokio::test]
async fn duplicate_version_row_is_a_unique_violation() {
    let (db, _store, id) = store_with_tender().await;

    let duplicate = tender_version::ActiveModel {
        id: Set(Uuid::new_v4()),
        tender_id: Set(id),
        name: Set("Road".to_string()),
        description: Set("Copy".to_string()),
        service_type: Set("Construction".to_string()),
        version: Set(1),
        created_at: Set(Utc::now().fixed_offset()),
    };
    let error = tender_version::Entity::insert(duplicate)
        .exec_without_returning(&*db)
        .await
        .unwrap_err();

    assert!(is_unique_violation(&error));
    assert!(!is_check_violation(&error));
}

#[tokio::test]
async fn status_outside_domain_is_a_check_violation() {
    let (db, _store, id) = store_with_tender().await;

    let error = tender::Entity::update_many()
        .col_expr(
            tender::Column::Status,
            sea_orm::sea_query::Expr::value("Archived"),
        )
        .filter(tender::Column::Id.eq(id))
        .exec(&*db)
        .await
        .unwrap_err();

    assert!(is_check_violation(&error));
    assert!(!is_unique_violation(&error));
}

#[tokio::test]
async fn rollback_to_missing_version_changes_nothing() {
    let (_db, store, id) = store_with_tender().await;

    let error = store.rollback(id, 4).await.unwrap_err();
    assert!(matches!(error, MarketError::NoSuchVersion));
    assert_eq!(store.get_by_id(id).await.unwrap().version, 1);
}

#[tokio::test]
async fn has_version_and_exists_reflect_storage() {
    let (_db, store, id) = store_with_tender().await;

    assert!(store.exists(id).await);
    assert!(!store.exists(Uuid::new_v4()).await);
    assert!(store.has_version(id, 1).await.unwrap());
    assert!(!store.has_version(id, 2).await.unwrap());
    assert!(!store.has_version(id, 0).await.unwrap());
}

#[tokio::test]
async fn author_listing_pages_by_name() {
    let (db, store, id) = store_with_tender().await;
    let author_id = tender::Entity::find_by_id(id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap()
        .author_id;
    let organization_id = tender::Entity::find_by_id(id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap()
        .organization_id;

    store
        .create(NewTender {
            name: "Canal".to_string(),
            description: "Dredge the canal".to_string(),
            service_type: ServiceType::Delivery,
            organization_id,
            author_id,
        })
        .await
        .unwrap();

    let first = store
        .list(TenderFilter::ByAuthor(author_id), Page::new(1, 0))
        .await
        .unwrap();
    let second = store
        .list(TenderFilter::ByAuthor(author_id), Page::new(1, 1))
        .await
        .unwrap();

    assert_eq!(first[0].name, "Canal");
    assert_eq!(second[0].name, "Road");
}

#[tokio::test]
async fn failed_first_version_leaves_no_tender_header() {
    let db = setup_test_db_arc().await.unwrap();
    let market = seed_marketplace(&db).await.unwrap();
    let store = TenderRepository::new(db.clone());
    db.execute_unprepared("DROP TABLE tender_version")
        .await
        .unwrap();

    let error = store
        .create(NewTender {
            name: "Bridge".to_string(),
            description: "Build a bridge".to_string(),
            service_type: ServiceType::Construction,
            organization_id: market.organization_id,
            author_id: market.owner_id,
        })
        .await
        .unwrap_err();

    assert!(matches!(error, MarketError::Internal));
    assert_eq!(tender::Entity::find().count(&*db).await.unwrap(), 0);
}

#[tokio::test]
async fn failed_first_version_leaves_no_bid_header() {
    let (db, _store, tender_id) = store_with_tender().await;
    let author_id = tender::Entity::find_by_id(tender_id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap()
        .author_id;
    let bids = BidRepository::new(db.clone());
    db.execute_unprepared("DROP TABLE bid_version").await.unwrap();

    let error = bids
        .create(NewBid {
            name: "Offer".to_string(),
            description: "Resurface in a week".to_string(),
            tender_id,
            author_type: AuthorType::User,
            author_id,
        })
        .await
        .unwrap_err();

    assert!(matches!(error, MarketError::Internal));
    assert_eq!(bid::Entity::find().count(&*db).await.unwrap(), 0);
}

#[tokio::test]
async fn oversized_pages_are_capped_before_binding() {
    let (db, store, id) = store_with_tender().await;
    let author_id = tender::Entity::find_by_id(id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap()
        .author_id;

    let all = store
        .list(TenderFilter::ByAuthor(author_id), Page::new(u64::MAX, 0))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    let none = store
        .list(TenderFilter::ByAuthor(author_id), Page::new(1, u64::MAX))
        .await
        .unwrap();
    assert!(none.is_empty());

    let bids = BidRepository::new(db.clone())
        .list(BidFilter::ByTender(id), Page::new(u64::MAX, u64::MAX))
        .await
        .unwrap();
    assert!(bids.is_empty());
}
