//! Organization entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Organization that owns tenders
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "organization")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    pub description: Option<String>,

    /// Legal form (IE, LLC or JSC)
    #[sea_orm(column_name = "type")]
    pub organization_type: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::organization_responsible::Entity")]
    OrganizationResponsible,
    #[sea_orm(has_many = "super::tender::Entity")]
    Tender,
}

impl Related<super::organization_responsible::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrganizationResponsible.def()
    }
}

impl Related<super::tender::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tender.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
