//! Bid header entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Bid header: identity, parent tender, author and mutable status
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bid")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tender_id: Uuid,

    /// Organization or User
    pub author_type: String,

    /// Employee who submitted the bid
    pub author_id: Uuid,

    pub status: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tender::Entity",
        from = "Column::TenderId",
        to = "super::tender::Column::Id"
    )]
    Tender,
    #[sea_orm(has_many = "super::bid_version::Entity")]
    BidVersion,
}

impl Related<super::tender::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tender.def()
    }
}

impl Related<super::bid_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BidVersion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
