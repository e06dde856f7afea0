//! Migration to create the organization and organization_responsible tables.
//!
//! `organization_responsible` is the many-to-many relation that grants an
//! employee management rights over an organization's tenders.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organization::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organization::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organization::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Organization::Description).text().null())
                    .col(
                        ColumnDef::new(Organization::Type)
                            .string_len(16)
                            .null()
                            .check(Expr::col(Organization::Type).is_in(["IE", "LLC", "JSC"])),
                    )
                    .col(
                        ColumnDef::new(Organization::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Organization::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrganizationResponsible::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrganizationResponsible::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrganizationResponsible::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationResponsible::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organization_responsible_organization_id")
                            .from(
                                OrganizationResponsible::Table,
                                OrganizationResponsible::OrganizationId,
                            )
                            .to(Organization::Table, Organization::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organization_responsible_user_id")
                            .from(
                                OrganizationResponsible::Table,
                                OrganizationResponsible::UserId,
                            )
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_organization_responsible_org_user")
                    .table(OrganizationResponsible::Table)
                    .col(OrganizationResponsible::OrganizationId)
                    .col(OrganizationResponsible::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Lookups by employee drive every authorization check
        manager
            .create_index(
                Index::create()
                    .name("idx_organization_responsible_user_id")
                    .table(OrganizationResponsible::Table)
                    .col(OrganizationResponsible::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_organization_responsible_user_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_organization_responsible_org_user")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(OrganizationResponsible::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Organization::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Organization {
    Table,
    Id,
    Name,
    Description,
    Type,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrganizationResponsible {
    Table,
    Id,
    OrganizationId,
    UserId,
}

#[derive(DeriveIden)]
enum Employee {
    Table,
    Id,
}
