//! Tender header entity model
//!
//! The header holds identity, ownership and the in-place mutable status.
//! Editable attributes live in [`super::tender_version`].

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tender")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning organization, fixed at creation
    pub organization_id: Uuid,

    /// Employee who created the tender
    pub author_id: Uuid,

    /// Created, Published or Closed
    pub status: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id"
    )]
    Organization,
    #[sea_orm(has_many = "super::tender_version::Entity")]
    TenderVersion,
    #[sea_orm(has_many = "super::bid::Entity")]
    Bid,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::tender_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TenderVersion.def()
    }
}

impl Related<super::bid::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bid.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
