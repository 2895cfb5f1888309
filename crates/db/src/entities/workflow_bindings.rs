//! `SeaORM` Entity for workflow_bindings table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "workflow_bindings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub account_id: i64,
    pub template_id: i64,
    /// Lower wins; ties broken by most-recent creation.
    pub priority: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workflow_templates::Entity",
        from = "Column::TemplateId",
        to = "super::workflow_templates::Column::Id"
    )]
    WorkflowTemplates,
}

impl Related<super::workflow_templates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkflowTemplates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
