//! `SeaORM` Entity for request_routes table.
//!
//! Append-only audit trail per purchase request. Stage labels are free-form
//! strings and are preserved byte-exact.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "request_routes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub request_id: i64,
    pub stage: String,
    pub user_name: String,
    pub time: DateTimeWithTimeZone,
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
