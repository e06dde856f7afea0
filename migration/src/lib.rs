//! Database migrations for the tender marketplace.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2024_09_01_000001_create_employees;
mod m2024_09_01_000002_create_organizations;
mod m2024_09_01_000003_create_tenders;
mod m2024_09_01_000004_create_bids;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_09_01_000001_create_employees::Migration),
            Box::new(m2024_09_01_000002_create_organizations::Migration),
            Box::new(m2024_09_01_000003_create_tenders::Migration),
            Box::new(m2024_09_01_000004_create_bids::Migration),
        ]
    }
}
