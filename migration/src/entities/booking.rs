//! 预约记录
//!
//! active_slot 在预约有效时为 "{user}:{class}:{date}"，取消后置 NULL，
//! 唯一索引保证同一用户同一天同一课程最多一条有效预约。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub class_id: i32,
    pub session_id: i32,
    pub booking_date: Date,
    pub booked_at: DateTimeUtc,
    pub credits_charged: i32,
    pub cancelled_at: Option<DateTimeUtc>,
    pub cancelled_by_user: Option<bool>,
    pub credit_refunded: bool,
    #[sea_orm(unique)]
    pub active_slot: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
