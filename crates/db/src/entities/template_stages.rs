//! `SeaORM` Entity for template_stages table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "template_stages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub template_id: i64,
    pub stage_name: String,
    /// Unique within the template, ≥ 1.
    pub sort_order: i32,
    pub owner_department_id: i64,
    /// Whether reviewers at this stage may send items back for revision.
    pub allow_revise: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workflow_templates::Entity",
        from = "Column::TemplateId",
        to = "super::workflow_templates::Column::Id"
    )]
    WorkflowTemplates,
    #[sea_orm(
        belongs_to = "super::departments::Entity",
        from = "Column::OwnerDepartmentId",
        to = "super::departments::Column::Id"
    )]
    Departments,
}

impl Related<super::workflow_templates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkflowTemplates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
