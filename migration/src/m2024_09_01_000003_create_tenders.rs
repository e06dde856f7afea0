//! Migration to create the tender and tender_version tables.
//!
//! A tender header carries identity, ownership and the mutable status. Every
//! edit or rollback appends a row to `tender_version`; the row with the
//! highest version number is the current content of the tender.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tender::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tender::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tender::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Tender::AuthorId).uuid().not_null())
                    .col(
                        ColumnDef::new(Tender::Status)
                            .text()
                            .not_null()
                            .default("Created")
                            .check(
                                Expr::col(Tender::Status)
                                    .is_in(["Created", "Published", "Closed"]),
                            ),
                    )
                    .col(
                        ColumnDef::new(Tender::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tender_organization_id")
                            .from(Tender::Table, Tender::OrganizationId)
                            .to(Organization::Table, Organization::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tender_author_id")
                            .from(Tender::Table, Tender::AuthorId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TenderVersion::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TenderVersion::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TenderVersion::TenderId).uuid().not_null())
                    .col(ColumnDef::new(TenderVersion::Name).text().not_null())
                    .col(ColumnDef::new(TenderVersion::Description).text().not_null())
                    .col(
                        ColumnDef::new(TenderVersion::ServiceType)
                            .text()
                            .not_null()
                            .check(
                                Expr::col(TenderVersion::ServiceType)
                                    .is_in(["Construction", "Delivery", "Manufacture"]),
                            ),
                    )
                    .col(ColumnDef::new(TenderVersion::Version).integer().not_null())
                    .col(
                        ColumnDef::new(TenderVersion::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tender_version_tender_id")
                            .from(TenderVersion::Table, TenderVersion::TenderId)
                            .to(Tender::Table, Tender::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (tender, version); concurrent editors collide here
        manager
            .create_index(
                Index::create()
                    .name("idx_tender_version_tender_version")
                    .table(TenderVersion::Table)
                    .col(TenderVersion::TenderId)
                    .col(TenderVersion::Version)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tender_organization_id")
                    .table(Tender::Table)
                    .col(Tender::OrganizationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_tender_organization_id").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_tender_version_tender_version")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(TenderVersion::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tender::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tender {
    Table,
    Id,
    OrganizationId,
    AuthorId,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TenderVersion {
    Table,
    Id,
    TenderId,
    Name,
    Description,
    ServiceType,
    Version,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Organization {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Employee {
    Table,
    Id,
}
