//! `SeaORM` Entity for purchasing_requests table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchasing_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub request_id: i64,
    pub user_id: i64,
    /// One of `Pending`, `Forwarded`, `Revised`, `RevisedByUp`, `Approved`.
    pub status: String,
    /// One of `Decided`, `Incomplete`, `Revised`, or null.
    pub mod_status: Option<String>,
    /// One of `Decided`, `Incomplete`, `Revised`, or null.
    pub coordinator_status: Option<String>,
    pub revise_comment: Option<String>,
    pub revise_comment_by_coordinator: Option<String>,
    pub total_amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub is_printed: bool,
    pub verification_token: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchasing_request_items::Entity")]
    PurchasingRequestItems,
    #[sea_orm(has_many = "super::request_routes::Entity")]
    RequestRoutes,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::purchasing_request_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchasingRequestItems.def()
    }
}

impl Related<super::request_routes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequestRoutes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
