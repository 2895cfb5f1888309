//! `SeaORM` Entity for budget_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub budget_id: i64,
    pub account_id: i64,
    pub item_id: Option<i64>,
    pub item_name: String,
    pub itemdescription: Option<String>,
    pub quantity: Decimal,
    pub cost: Decimal,
    pub unit: String,
    pub period_months: i32,
    pub notes: Option<String>,
    /// Logistics outcome mirror: `in_stock`, `in_partial`, `out_of_stock`.
    pub storage_status: Option<String>,
    pub storage_provided_qty: Option<Decimal>,
    /// 1 needed, 0 not needed, null undecided.
    pub needed_status: Option<i16>,
    pub needed_notes: Option<String>,
    pub purchase_cost: Option<Decimal>,
    pub final_purchase_cost: Option<Decimal>,
    pub final_quantity: Option<Decimal>,
    /// One of `approved`, `adjusted`, `rejected`, or null.
    pub final_purchase_status: Option<String>,
    pub workflow_done: bool,
    /// One of `none`, `pending`, `answered`, `resolved`.
    pub revision_state: String,
    pub revise_reason: Option<String>,
    pub revised_at: Option<DateTimeWithTimeZone>,
    pub route_template_id: Option<i64>,
    pub current_step_id: Option<i64>,
    pub current_stage: Option<String>,
    pub current_step_order: Option<i32>,
    pub current_owner_department_id: Option<i64>,
    pub next_step_id: Option<i64>,
    pub next_stage: Option<String>,
    pub next_owner_department_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budgets::Entity",
        from = "Column::BudgetId",
        to = "super::budgets::Column::Id"
    )]
    Budgets,
    #[sea_orm(
        belongs_to = "super::sub_accounts::Entity",
        from = "Column::AccountId",
        to = "super::sub_accounts::Column::Id"
    )]
    SubAccounts,
    #[sea_orm(has_many = "super::steps::Entity")]
    Steps,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl Related<super::steps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Steps.def()
    }
}

impl Related<super::sub_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
