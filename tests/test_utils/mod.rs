//! Test utilities for database testing.
//!
//! Sets up in-memory SQLite databases with every migration applied and seeds
//! the identity tables the workflows authorize against.

use anyhow::Result;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use std::sync::Arc;
use tender_market::models::{employee, organization, organization_responsible};
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool holds exactly one connection so every query sees the same
/// in-memory database.
#[allow(dead_code)]
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// Inserts an employee and returns its id.
#[allow(dead_code)]
pub async fn seed_employee(db: &DatabaseConnection, username: &str) -> Result<Uuid> {
    let now = Utc::now().fixed_offset();
    let id = Uuid::new_v4();
    employee::ActiveModel {
        id: Set(id),
        username: Set(username.to_string()),
        first_name: Set(Some("Test".to_string())),
        last_name: Set(Some(username.to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}

/// Inserts an organization and returns its id.
#[allow(dead_code)]
pub async fn seed_organization(db: &DatabaseConnection, name: &str) -> Result<Uuid> {
    let now = Utc::now().fixed_offset();
    let id = Uuid::new_v4();
    organization::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        description: Set(None),
        organization_type: Set(Some("LLC".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}

/// Makes `user_id` responsible for `organization_id`.
#[allow(dead_code)]
pub async fn seed_responsible(
    db: &DatabaseConnection,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<()> {
    organization_responsible::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        user_id: Set(user_id),
    }
    .insert(db)
    .await?;
    Ok(())
}

/// An organization with one responsible employee and one outsider.
#[allow(dead_code)]
pub struct Marketplace {
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    pub outsider_id: Uuid,
}

#[allow(dead_code)]
pub const OWNER: &str = "owner";
#[allow(dead_code)]
pub const OUTSIDER: &str = "outsider";

/// Seeds `owner` responsible for "Acme" and an unaffiliated `outsider`.
#[allow(dead_code)]
pub async fn seed_marketplace(db: &DatabaseConnection) -> Result<Marketplace> {
    let organization_id = seed_organization(db, "Acme").await?;
    let owner_id = seed_employee(db, OWNER).await?;
    let outsider_id = seed_employee(db, OUTSIDER).await?;
    seed_responsible(db, organization_id, owner_id).await?;

    Ok(Marketplace {
        organization_id,
        owner_id,
        outsider_id,
    })
}
