//! Migration to create the bid and bid_version tables.
//!
//! Bids follow the same header/version split as tenders.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bid::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bid::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Bid::TenderId).uuid().not_null())
                    .col(
                        ColumnDef::new(Bid::AuthorType)
                            .text()
                            .not_null()
                            .check(Expr::col(Bid::AuthorType).is_in(["Organization", "User"])),
                    )
                    .col(ColumnDef::new(Bid::AuthorId).uuid().not_null())
                    .col(
                        ColumnDef::new(Bid::Status)
                            .text()
                            .not_null()
                            .default("Created")
                            .check(Expr::col(Bid::Status).is_in([
                                "Created",
                                "Published",
                                "Canceled",
                                "Approved",
                                "Rejected",
                            ])),
                    )
                    .col(
                        ColumnDef::new(Bid::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bid_tender_id")
                            .from(Bid::Table, Bid::TenderId)
                            .to(Tender::Table, Tender::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bid_author_id")
                            .from(Bid::Table, Bid::AuthorId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BidVersion::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BidVersion::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BidVersion::BidId).uuid().not_null())
                    .col(ColumnDef::new(BidVersion::Name).text().not_null())
                    .col(ColumnDef::new(BidVersion::Description).text().not_null())
                    .col(ColumnDef::new(BidVersion::Version).integer().not_null())
                    .col(
                        ColumnDef::new(BidVersion::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bid_version_bid_id")
                            .from(BidVersion::Table, BidVersion::BidId)
                            .to(Bid::Table, Bid::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bid_version_bid_version")
                    .table(BidVersion::Table)
                    .col(BidVersion::BidId)
                    .col(BidVersion::Version)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bid_tender_id")
                    .table(Bid::Table)
                    .col(Bid::TenderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_bid_tender_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_bid_version_bid_version").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(BidVersion::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Bid::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Bid {
    Table,
    Id,
    TenderId,
    AuthorType,
    AuthorId,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum BidVersion {
    Table,
    Id,
    BidId,
    Name,
    Description,
    Version,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tender {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Employee {
    Table,
    Id,
}
