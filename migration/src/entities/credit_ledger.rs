//! 积分流水：余额 = 该用户所有 delta 之和

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "credit_ledger")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub pass_id: Option<i32>,
    pub delta: i32,
    pub reason: String,
    pub ref_id: Option<i32>,
    /// 同一业务事件只能落一条流水（NULL 不参与唯一约束）
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
