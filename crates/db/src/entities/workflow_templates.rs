//! `SeaORM` Entity for workflow_templates table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "workflow_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::template_stages::Entity")]
    TemplateStages,
    #[sea_orm(has_many = "super::workflow_bindings::Entity")]
    WorkflowBindings,
}

impl Related<super::template_stages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateStages.def()
    }
}

impl Related<super::workflow_bindings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkflowBindings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
