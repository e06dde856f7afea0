//! Employee entity model
//!
//! Employees are the callers of every workflow operation; they are
//! identified on the wire by `username`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employee")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique login name
    #[sea_orm(unique)]
    pub username: String,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::organization_responsible::Entity")]
    OrganizationResponsible,
}

impl Related<super::organization_responsible::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrganizationResponsible.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
