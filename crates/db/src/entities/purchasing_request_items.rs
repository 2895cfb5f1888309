//! `SeaORM` Entity for purchasing_request_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchasing_request_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub item_id: i64,
    pub request_id: i64,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub description: Option<String>,
    pub total_price: Decimal,
    /// `needed`, `not-needed`, or null (counts as needed downstream).
    pub mod_decision: Option<String>,
    /// `needed`, `not-needed`, or null (counts as needed downstream).
    pub coordinator_decision: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchasing_requests::Entity",
        from = "Column::RequestId",
        to = "super::purchasing_requests::Column::RequestId"
    )]
    PurchasingRequests,
}

impl Related<super::purchasing_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchasingRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
