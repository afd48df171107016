//! 积分流水
//!
//! 余额永远由流水求和得到，不单独存储。每条业务流水带幂等键，
//! 唯一索引保证同一事件只记一次账。

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use tracing::info;

use super::converters::{model_to_ledger_entry, model_to_purchase};
use super::{SeaOrmStorage, is_unique_violation, retry};
use crate::errors::{Result, StudioError};
use crate::storage::models::{
    CreditSummary, LedgerEntry, LedgerReason, Pass, Purchase, PurchaseRecord,
};
use crate::utils::time::studio_today;

use migration::entities::{credit_ledger, pass, purchase};

/// 支付成功后待入账的购买
#[derive(Debug, Clone)]
pub struct NewPurchase<'a> {
    pub user_id: &'a str,
    pub pass: &'a Pass,
    pub payment_reference: &'a str,
    pub purchased_at: DateTime<Utc>,
}

/// 无限卡有效期：[starts, ends)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnlimitedWindow {
    pub starts: NaiveDate,
    pub ends: Option<NaiveDate>,
}

impl UnlimitedWindow {
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.starts && self.ends.is_none_or(|end| date < end)
    }
}

pub(crate) fn purchase_key(payment_reference: &str) -> String {
    format!("purchase:{}", payment_reference)
}

/// 写入一条流水，返回 DbErr 以便调用方识别唯一约束冲突
#[allow(clippy::too_many_arguments)]
pub(crate) async fn insert_entry<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    pass_id: Option<i32>,
    delta: i32,
    reason: LedgerReason,
    ref_id: Option<i32>,
    idempotency_key: Option<String>,
    now: DateTime<Utc>,
) -> std::result::Result<credit_ledger::Model, DbErr> {
    let model = credit_ledger::ActiveModel {
        user_id: Set(user_id.to_string()),
        pass_id: Set(pass_id),
        delta: Set(delta),
        reason: Set(reason.as_ref().to_string()),
        ref_id: Set(ref_id),
        idempotency_key: Set(idempotency_key),
        created_at: Set(now),
        ..Default::default()
    };
    model.insert(conn).await
}

/// 当前余额 = Σ delta
pub(crate) async fn balance_on<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
) -> std::result::Result<i64, DbErr> {
    let deltas: Vec<i32> = credit_ledger::Entity::find()
        .select_only()
        .column(credit_ledger::Column::Delta)
        .filter(credit_ledger::Column::UserId.eq(user_id))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(deltas.into_iter().map(i64::from).sum())
}

/// 用户所有无限卡的有效期，按场馆本地日期计算
pub(crate) async fn unlimited_windows<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    offset: FixedOffset,
) -> Result<Vec<UnlimitedWindow>> {
    let purchases = purchase::Entity::find()
        .filter(purchase::Column::UserId.eq(user_id))
        .all(conn)
        .await?;
    if purchases.is_empty() {
        return Ok(Vec::new());
    }

    let passes: HashMap<i32, pass::Model> = pass::Entity::find()
        .filter(pass::Column::Id.is_in(purchases.iter().map(|p| p.pass_id)))
        .filter(pass::Column::Unlimited.eq(true))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(purchases
        .iter()
        .filter_map(|p| {
            let pass = passes.get(&p.pass_id)?;
            let starts = studio_today(p.purchased_at, offset);
            let ends = pass
                .validity_days
                .map(|days| starts + Duration::days(i64::from(days)));
            Some(UnlimitedWindow { starts, ends })
        })
        .collect())
}

impl SeaOrmStorage {
    pub async fn balance(&self, user_id: &str) -> Result<i64> {
        let db = &self.db;
        retry::with_retry("balance", self.retry_config, || balance_on(db, user_id))
            .await
            .map_err(|e| StudioError::database_operation(format!("查询余额失败: {}", e)))
    }

    /// 全部流水，最新在前
    pub async fn ledger_entries(&self, user_id: &str) -> Result<Vec<LedgerEntry>> {
        let rows = credit_ledger::Entity::find()
            .filter(credit_ledger::Column::UserId.eq(user_id))
            .order_by_desc(credit_ledger::Column::CreatedAt)
            .order_by_desc(credit_ledger::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(model_to_ledger_entry).collect())
    }

    pub async fn credit_summary(
        &self,
        user_id: &str,
        today: NaiveDate,
        offset: FixedOffset,
    ) -> Result<CreditSummary> {
        let entries = credit_ledger::Entity::find()
            .filter(credit_ledger::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;

        let balance: i64 = entries.iter().map(|e| i64::from(e.delta)).sum();
        let count_reason = |reason: LedgerReason| {
            entries
                .iter()
                .filter(|e| e.reason == reason.as_ref())
                .count() as i64
        };
        let total_purchased: i64 = entries
            .iter()
            .filter(|e| e.reason == LedgerReason::PassPurchase.as_ref() && e.delta > 0)
            .map(|e| i64::from(e.delta))
            .sum();
        let classes_used = (count_reason(LedgerReason::ClassBooking)
            - count_reason(LedgerReason::ClassCancellation))
        .max(0);

        // 购买 id -> 入账积分
        let credited: HashMap<i32, i32> = entries
            .iter()
            .filter(|e| {
                e.reason == LedgerReason::PassPurchase.as_ref()
                    || e.reason == LedgerReason::UnlimitedPassPurchase.as_ref()
            })
            .filter_map(|e| e.ref_id.map(|id| (id, e.delta)))
            .collect();

        let purchases = purchase::Entity::find()
            .filter(purchase::Column::UserId.eq(user_id))
            .order_by_desc(purchase::Column::PurchasedAt)
            .all(&self.db)
            .await?;
        let passes: HashMap<i32, pass::Model> = pass::Entity::find()
            .filter(pass::Column::Id.is_in(purchases.iter().map(|p| p.pass_id)))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let records = purchases
            .iter()
            .map(|p| {
                let pass = passes.get(&p.pass_id);
                PurchaseRecord {
                    purchase_id: p.id,
                    pass_id: p.pass_id,
                    pass_name: pass.map(|x| x.name.clone()).unwrap_or_default(),
                    credits_added: credited.get(&p.id).copied().unwrap_or(0),
                    unlimited: pass.is_some_and(|x| x.unlimited),
                    purchased_at: p.purchased_at,
                }
            })
            .collect();

        let covering = unlimited_windows(&self.db, user_id, offset)
            .await?
            .into_iter()
            .filter(|w| w.covers(today))
            .max_by_key(|w| w.starts);

        Ok(CreditSummary {
            balance,
            total_purchased,
            classes_used,
            has_unlimited: covering.is_some(),
            unlimited_until: covering.and_then(|w| w.ends),
            purchases: records,
        })
    }

    /// 记录一次成功支付：购买记录和入账流水在同一事务中写入。
    ///
    /// 同一 payment_reference 已入账时返回 `Ok(None)`，不写任何数据。
    pub async fn record_purchase(&self, new: NewPurchase<'_>) -> Result<Option<Purchase>> {
        let existing = purchase::Entity::find()
            .filter(purchase::Column::PaymentReference.eq(new.payment_reference))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            info!(
                "Payment {} already recorded, skipping",
                new.payment_reference
            );
            return Ok(None);
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| StudioError::database_operation(format!("开始事务失败: {}", e)))?;

        let model = purchase::ActiveModel {
            user_id: Set(new.user_id.to_string()),
            pass_id: Set(new.pass.id),
            payment_reference: Set(new.payment_reference.to_string()),
            purchased_at: Set(new.purchased_at),
            ..Default::default()
        };
        let inserted = match model.insert(&txn).await {
            Ok(m) => m,
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let (delta, reason) = if new.pass.unlimited {
            (0, LedgerReason::UnlimitedPassPurchase)
        } else {
            (new.pass.credits, LedgerReason::PassPurchase)
        };
        match insert_entry(
            &txn,
            new.user_id,
            Some(new.pass.id),
            delta,
            reason,
            Some(inserted.id),
            Some(purchase_key(new.payment_reference)),
            new.purchased_at,
        )
        .await
        {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        txn.commit()
            .await
            .map_err(|e| StudioError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Purchase {} recorded: user={}, pass={}, delta={}",
            inserted.id, new.user_id, new.pass.id, delta
        );
        Ok(Some(model_to_purchase(inserted)))
    }

    /// 人工调整积分
    pub async fn grant_credits(
        &self,
        user_id: &str,
        delta: i32,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        let entry = insert_entry(
            &self.db,
            user_id,
            None,
            delta,
            LedgerReason::ManualAdjustment,
            None,
            None,
            now,
        )
        .await?;
        Ok(model_to_ledger_entry(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_unlimited_window_bounds() {
        let window = UnlimitedWindow {
            starts: d(2025, 6, 1),
            ends: Some(d(2025, 7, 1)),
        };
        assert!(window.covers(d(2025, 6, 1)));
        assert!(window.covers(d(2025, 6, 30)));
        assert!(!window.covers(d(2025, 7, 1)));
        assert!(!window.covers(d(2025, 5, 31)));
    }

    #[test]
    fn test_unlimited_window_without_expiry() {
        let window = UnlimitedWindow {
            starts: d(2025, 6, 1),
            ends: None,
        };
        assert!(window.covers(d(2030, 1, 1)));
    }

    #[test]
    fn test_purchase_key() {
        assert_eq!(purchase_key("pi_123"), "purchase:pi_123");
    }
}
