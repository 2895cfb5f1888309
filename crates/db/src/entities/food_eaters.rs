//! `SeaORM` Entity for food_eaters table.
//!
//! Per-school eater counts; denominator for kcal/person reporting.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "food_eaters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub school_id: i64,
    pub eating_number: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::schools::Entity",
        from = "Column::SchoolId",
        to = "super::schools::Column::Id"
    )]
    Schools,
}

impl ActiveModelBehavior for ActiveModel {}
