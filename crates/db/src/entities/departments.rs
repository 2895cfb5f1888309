//! `SeaORM` Entity for departments table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "departments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub code: String,
    pub name: String,
    pub active: bool,
    pub notify_email: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::control_assignments::Entity")]
    ControlAssignments,
}

impl Related<super::control_assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ControlAssignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
