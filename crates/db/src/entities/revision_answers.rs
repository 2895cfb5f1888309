//! `SeaORM` Entity for revision_answers table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "revision_answers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub budget_id: i64,
    pub item_id: i64,
    pub answer_text: String,
    pub created_at: DateTimeWithTimeZone,
    pub author_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budget_items::Entity",
        from = "Column::ItemId",
        to = "super::budget_items::Column::Id"
    )]
    BudgetItems,
}

impl Related<super::budget_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
