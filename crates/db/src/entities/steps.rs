//! `SeaORM` Entity for steps table.
//!
//! Steps are materialized per budget item from the resolved template and are
//! owned by their item: deleting the item deletes its steps.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "steps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub budget_id: i64,
    pub budget_item_id: i64,
    pub account_id: i64,
    pub step_name: String,
    /// Unique with budget_item_id; frozen at materialization.
    pub sort_order: i32,
    pub owner_of_step: i64,
    /// One of `pending`, `confirmed`, `needed`, `not_needed`, `in_stock`,
    /// `in_partial`, `out_of_stock`, `skipped`.
    pub step_status: String,
    /// 0 or 1; at most one current step per item.
    pub is_current: i16,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budget_items::Entity",
        from = "Column::BudgetItemId",
        to = "super::budget_items::Column::Id"
    )]
    BudgetItems,
    #[sea_orm(
        belongs_to = "super::budgets::Entity",
        from = "Column::BudgetId",
        to = "super::budgets::Column::Id"
    )]
    Budgets,
}

impl Related<super::budget_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
