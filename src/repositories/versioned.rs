//! Shared contract and helpers for the append-only versioned stores.
//!
//! Tenders and bids are stored as a header row plus an immutable version
//! history. The current entity is the header joined with its highest
//! version. Edits and rollbacks append `max + 1` inside a transaction; the
//! unique `(entity_id, version)` index turns a concurrent writer into a
//! unique violation, which is retried.

use std::future::Future;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DatabaseTransaction, DbErr};
use uuid::Uuid;

use crate::error::{MarketError, is_check_violation, is_unique_violation, map_db_err};

/// Attempts made to append a version before giving up on contention.
pub const MAX_VERSION_ATTEMPTS: usize = 3;

/// Limit/offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

/// Largest limit or offset the SQL drivers can bind.
pub const MAX_PAGE_VALUE: u64 = i64::MAX as u64;

impl Page {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// Caps both fields at [`MAX_PAGE_VALUE`].
    pub fn bounded(self) -> Self {
        Self {
            limit: self.limit.min(MAX_PAGE_VALUE),
            offset: self.offset.min(MAX_PAGE_VALUE),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 5,
            offset: 0,
        }
    }
}

/// Versioned entity store.
///
/// `exists` is fail-closed while `has_version` surfaces storage failures as
/// [`MarketError::Internal`].
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Materialized entity returned to callers.
    type Record: Send;
    /// Attributes supplied at creation.
    type NewRecord: Send;
    /// Partial attribute update; `None` keeps the latest value.
    type Patch: Send + Sync;
    /// List filter.
    type Filter: Send;

    /// Inserts the header and version 1 atomically.
    async fn create(&self, new: Self::NewRecord) -> Result<Self::Record, MarketError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Self::Record, MarketError>;

    async fn exists(&self, id: Uuid) -> bool;

    async fn has_version(&self, id: Uuid, version: i32) -> Result<bool, MarketError>;

    /// Appends a version built from the latest one with `patch` applied.
    async fn edit(&self, id: Uuid, patch: Self::Patch) -> Result<Self::Record, MarketError>;

    /// Appends a version whose content is copied from `version`.
    async fn rollback(&self, id: Uuid, version: i32) -> Result<Self::Record, MarketError>;

    /// Replaces the header status in place.
    async fn update_status(&self, id: Uuid, status: &str) -> Result<Self::Record, MarketError>;

    /// Lists current entities ordered by name, then id.
    async fn list(&self, filter: Self::Filter, page: Page)
    -> Result<Vec<Self::Record>, MarketError>;
}

/// Failure while appending a version.
#[derive(Debug)]
pub(crate) enum AppendError {
    Db(DbErr),
    Domain(MarketError),
}

impl AppendError {
    /// Collapses any storage failure to [`MarketError::Internal`].
    pub(crate) fn into_internal(self, context: &str) -> MarketError {
        match self {
            AppendError::Db(error) => map_db_err(context, error, MarketError::Internal),
            AppendError::Domain(error) => error,
        }
    }
}

impl From<DbErr> for AppendError {
    fn from(error: DbErr) -> Self {
        AppendError::Db(error)
    }
}

impl From<MarketError> for AppendError {
    fn from(error: MarketError) -> Self {
        AppendError::Domain(error)
    }
}

/// Runs `append` until it succeeds, fails for a reason other than a version
/// collision, or runs out of attempts.
pub(crate) async fn retry_on_version_conflict<T, F, Fut>(
    entity: &'static str,
    id: Uuid,
    mut append: F,
) -> Result<T, MarketError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppendError>>,
{
    let mut attempt = 1;
    loop {
        match append().await {
            Ok(value) => return Ok(value),
            Err(AppendError::Domain(error)) => return Err(error),
            Err(AppendError::Db(error)) if is_unique_violation(&error) => {
                if attempt >= MAX_VERSION_ATTEMPTS {
                    tracing::error!(
                        entity,
                        %id,
                        attempts = attempt,
                        "Gave up appending version after repeated conflicts"
                    );
                    return Err(MarketError::Internal);
                }
                tracing::warn!(entity, %id, attempt, "Version number taken, retrying");
                attempt += 1;
            }
            Err(AppendError::Db(error)) if is_check_violation(&error) => {
                tracing::debug!(entity, %id, error = ?error, "Version rejected by constraint");
                return Err(MarketError::InvalidAttributeValue);
            }
            Err(AppendError::Db(error)) => {
                tracing::error!(entity, %id, error = ?error, "Failed to append version");
                return Err(MarketError::Internal);
            }
        }
    }
}

/// Commits on success and rolls back on failure.
pub(crate) async fn finish_txn<T>(
    txn: DatabaseTransaction,
    result: Result<T, AppendError>,
) -> Result<T, AppendError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = txn.rollback().await {
                tracing::warn!(error = ?rollback_error, "Failed to roll back transaction");
            }
            Err(error)
        }
    }
}

/// Picks the patched value, keeping `current` when no new value was given.
pub(crate) fn patched(current: &str, update: Option<&String>) -> String {
    update.cloned().unwrap_or_else(|| current.to_string())
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn opaque_db_error() -> DbErr {
        DbErr::Custom("connection reset".to_string())
    }

    async fn versions_table() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        db.execute_unprepared(
            "CREATE TABLE versions (entity_id TEXT NOT NULL, version INTEGER NOT NULL, \
             UNIQUE (entity_id, version)); \
             INSERT INTO versions VALUES ('a', 1);",
        )
        .await
        .unwrap();
        db
    }

    /// Inserts a row that collides with `('a', 1)`.
    async fn taken_version(db: &DatabaseConnection) -> DbErr {
        db.execute_unprepared("INSERT INTO versions VALUES ('a', 1)")
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn version_collision_is_retried_until_it_succeeds() {
        let db = versions_table().await;
        let calls = AtomicUsize::new(0);

        let result = retry_on_version_conflict("tender", Uuid::new_v4(), || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let db = &db;
            async move {
                if call < MAX_VERSION_ATTEMPTS {
                    Err(AppendError::Db(taken_version(db).await))
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), MAX_VERSION_ATTEMPTS);
        assert_eq!(calls.load(Ordering::SeqCst), MAX_VERSION_ATTEMPTS);
    }

    #[tokio::test]
    async fn persistent_version_collision_gives_up_as_internal() {
        let db = versions_table().await;
        let calls = AtomicUsize::new(0);

        let result: Result<(), MarketError> =
            retry_on_version_conflict("bid", Uuid::new_v4(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                let db = &db;
                async move { Err(AppendError::Db(taken_version(db).await)) }
            })
            .await;

        assert!(matches!(result, Err(MarketError::Internal)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_VERSION_ATTEMPTS);
    }

    #[tokio::test]
    async fn collision_error_is_classified_as_unique_violation() {
        let db = versions_table().await;
        let error = taken_version(&db).await;

        assert!(is_unique_violation(&error));
    }

    #[test]
    fn default_page_is_five_from_zero() {
        assert_eq!(Page::default(), Page::new(5, 0));
    }

    #[test]
    fn bounded_page_fits_signed_bind() {
        assert_eq!(
            Page::new(u64::MAX, u64::MAX).bounded(),
            Page::new(MAX_PAGE_VALUE, MAX_PAGE_VALUE)
        );
        assert_eq!(Page::new(5, 10).bounded(), Page::new(5, 10));
    }

    #[test]
    fn patched_keeps_current_value_when_unset() {
        assert_eq!(patched("old", None), "old");
        assert_eq!(patched("old", Some(&"new".to_string())), "new");
    }

    #[tokio::test]
    async fn domain_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), MarketError> =
            retry_on_version_conflict("tender", Uuid::new_v4(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppendError::Domain(MarketError::NoSuchVersion)) }
            })
            .await;

        assert!(matches!(result, Err(MarketError::NoSuchVersion)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unclassified_db_errors_become_internal() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), MarketError> =
            retry_on_version_conflict("bid", Uuid::new_v4(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppendError::Db(opaque_db_error())) }
            })
            .await;

        assert!(matches!(result, Err(MarketError::Internal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
