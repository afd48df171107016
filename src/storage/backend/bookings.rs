//! 预约与取消
//!
//! 预约行和对应流水在同一事务内写入。并发保护：
//! - `active_slot` 唯一索引保证同一用户同一天同一课程只有一条有效预约；
//! - 流水幂等键 `booking:{id}` / `refund:{id}` 保证扣费和退款各只发生一次；
//! - 事务第一条语句锁定用户档案行，同一用户的余额检查和扣费串行；
//! - 容量检查前锁定时段行。
//!
//! SQLite 上 `lock_exclusive` 不生效，第一条语句是写操作时事务直接拿到数据库写锁
//! （等同 `BEGIN IMMEDIATE`），之后的读不会遇到 BUSY_SNAPSHOT。

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use tracing::{debug, info};

use super::converters::{model_to_booking, to_booking_detail};
use super::ledger::{balance_on, insert_entry, unlimited_windows};
use super::{SeaOrmStorage, is_unique_violation};
use crate::errors::{Result, StudioError};
use crate::storage::models::{Booking, BookingDetail, BookingRules, LedgerReason};
use crate::utils::time::{class_start_utc, weekday_index};

use migration::entities::{booking, class, class_session, profile};

pub const ALREADY_BOOKED_MSG: &str = "You are already booked for this class on this date";
pub const INSUFFICIENT_CREDITS_MSG: &str = "Insufficient credits. Please purchase a class pass.";

/// 预约请求
#[derive(Debug, Clone, Copy)]
pub struct NewBooking<'a> {
    pub user_id: &'a str,
    pub session_id: i32,
    pub booking_date: NaiveDate,
    pub now: DateTime<Utc>,
    pub rules: BookingRules,
}

/// 取消时是否退款
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelDecision {
    /// 距开课不少于取消窗口
    Refundable,
    /// 课程早已结束，允许清理但不退款
    NoRefund,
}

pub(crate) fn active_slot(user_id: &str, class_id: i32, date: NaiveDate) -> String {
    format!("{}:{}:{}", user_id, class_id, date)
}

pub(crate) fn booking_key(booking_id: i32) -> String {
    format!("booking:{}", booking_id)
}

pub(crate) fn refund_key(booking_id: i32) -> String {
    format!("refund:{}", booking_id)
}

fn window_label(window: Duration) -> String {
    let minutes = window.num_minutes();
    match minutes {
        60 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        m => format!("{} minutes", m),
    }
}

/// 判断能否取消：开课前窗口内到开课后同样长度内都不允许取消
pub fn cancellation_decision(
    class_start: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<CancelDecision> {
    let until_start = class_start - now;
    if until_start >= window {
        Ok(CancelDecision::Refundable)
    } else if until_start >= -window {
        Err(StudioError::cancellation_window(format!(
            "Cannot cancel within {} of class start",
            window_label(window)
        )))
    } else {
        Ok(CancelDecision::NoRefund)
    }
}

/// 锁定用户档案行，必须是事务内的第一条语句
async fn lock_user<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    now: DateTime<Utc>,
) -> std::result::Result<(), DbErr> {
    profile::Entity::update_many()
        .col_expr(profile::Column::UpdatedAt, Expr::value(now))
        .filter(profile::Column::Id.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// 批量补全课程和时段信息
async fn load_details<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<booking::Model>,
) -> Result<Vec<BookingDetail>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let sessions: HashMap<i32, class_session::Model> = class_session::Entity::find()
        .filter(class_session::Column::Id.is_in(rows.iter().map(|b| b.session_id)))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let classes: HashMap<i32, class::Model> = class::Entity::find()
        .filter(class::Column::Id.is_in(rows.iter().map(|b| b.class_id)))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(rows
        .into_iter()
        .filter_map(|b| {
            let session = sessions.get(&b.session_id)?;
            let class = classes.get(&b.class_id)?;
            Some(to_booking_detail(b, class, session))
        })
        .collect())
}

impl SeaOrmStorage {
    /// 预约一节课，返回预约和预约后的余额
    pub async fn book_class(&self, req: NewBooking<'_>) -> Result<(Booking, i64)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| StudioError::database_operation(format!("开始事务失败: {}", e)))?;
        lock_user(&txn, req.user_id, req.now).await?;

        let session = class_session::Entity::find_by_id(req.session_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| StudioError::not_found("Class session not found"))?;
        if !session.is_active {
            return Err(StudioError::validation(
                "This class session is no longer available",
            ));
        }

        let class = class::Entity::find_by_id(session.class_id)
            .one(&txn)
            .await?
            .ok_or_else(|| StudioError::not_found("Class not found"))?;
        if !class.is_active {
            return Err(StudioError::validation("This class is no longer available"));
        }

        if weekday_index(req.booking_date) != session.day_of_week {
            return Err(StudioError::validation(
                "This class does not run on the selected date",
            ));
        }

        let starts_at = class_start_utc(req.booking_date, session.start_time, req.rules.offset);
        if starts_at <= req.now {
            return Err(StudioError::validation(
                "Cannot book a class that has already started",
            ));
        }

        let slot = active_slot(req.user_id, class.id, req.booking_date);
        let duplicate = booking::Entity::find()
            .filter(booking::Column::ActiveSlot.eq(slot.as_str()))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            return Err(StudioError::already_booked(ALREADY_BOOKED_MSG));
        }

        let taken = booking::Entity::find()
            .filter(booking::Column::SessionId.eq(session.id))
            .filter(booking::Column::BookingDate.eq(req.booking_date))
            .filter(booking::Column::CancelledAt.is_null())
            .count(&txn)
            .await?;
        if taken >= class.max_capacity.max(0) as u64 {
            return Err(StudioError::class_full("This class is full"));
        }

        let unlimited = unlimited_windows(&txn, req.user_id, req.rules.offset)
            .await?
            .iter()
            .any(|w| w.covers(req.booking_date));
        let charged = if unlimited { 0 } else { 1 };
        if charged > 0 && balance_on(&txn, req.user_id).await? < i64::from(charged) {
            return Err(StudioError::insufficient_credits(INSUFFICIENT_CREDITS_MSG));
        }

        let model = booking::ActiveModel {
            user_id: Set(req.user_id.to_string()),
            class_id: Set(class.id),
            session_id: Set(session.id),
            booking_date: Set(req.booking_date),
            booked_at: Set(req.now),
            credits_charged: Set(charged),
            cancelled_at: Set(None),
            cancelled_by_user: Set(None),
            credit_refunded: Set(false),
            active_slot: Set(Some(slot)),
            ..Default::default()
        };
        let inserted = match model.insert(&txn).await {
            Ok(m) => m,
            // 并发请求抢先写入了同一个 slot
            Err(e) if is_unique_violation(&e) => {
                return Err(StudioError::already_booked(ALREADY_BOOKED_MSG));
            }
            Err(e) => return Err(e.into()),
        };

        insert_entry(
            &txn,
            req.user_id,
            None,
            -charged,
            LedgerReason::ClassBooking,
            Some(inserted.id),
            Some(booking_key(inserted.id)),
            req.now,
        )
        .await?;

        let balance_after = balance_on(&txn, req.user_id).await?;
        txn.commit()
            .await
            .map_err(|e| StudioError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Booking {} created: user={}, session={}, date={}, charged={}",
            inserted.id, req.user_id, session.id, req.booking_date, charged
        );
        Ok((model_to_booking(inserted), balance_after))
    }

    /// 取消预约，返回 (预约, 是否退款, 取消后余额)
    pub async fn cancel_booking(
        &self,
        user_id: &str,
        booking_id: i32,
        now: DateTime<Utc>,
        rules: BookingRules,
    ) -> Result<(Booking, bool, i64)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| StudioError::database_operation(format!("开始事务失败: {}", e)))?;
        lock_user(&txn, user_id, now).await?;

        let existing = booking::Entity::find_by_id(booking_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .filter(|b| b.user_id == user_id)
            .ok_or_else(|| StudioError::not_found("Booking not found"))?;
        if existing.cancelled_at.is_some() {
            return Err(StudioError::already_cancelled("Booking is already cancelled"));
        }

        let session = class_session::Entity::find_by_id(existing.session_id)
            .one(&txn)
            .await?
            .ok_or_else(|| StudioError::not_found("Class session not found"))?;
        let starts_at = class_start_utc(existing.booking_date, session.start_time, rules.offset);
        let decision = cancellation_decision(starts_at, now, rules.cancellation_window)?;

        let refund = decision == CancelDecision::Refundable
            && existing.credits_charged > 0
            && !existing.credit_refunded;

        // 条件更新：只有仍然有效的预约会被改动
        let updated = booking::Entity::update_many()
            .col_expr(booking::Column::CancelledAt, Expr::value(Some(now)))
            .col_expr(booking::Column::CancelledByUser, Expr::value(Some(true)))
            .col_expr(booking::Column::ActiveSlot, Expr::value(Option::<String>::None))
            .col_expr(booking::Column::CreditRefunded, Expr::value(refund))
            .filter(booking::Column::Id.eq(booking_id))
            .filter(booking::Column::CancelledAt.is_null())
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(StudioError::already_cancelled("Booking is already cancelled"));
        }

        if refund {
            match insert_entry(
                &txn,
                user_id,
                None,
                existing.credits_charged,
                LedgerReason::ClassCancellation,
                Some(booking_id),
                Some(refund_key(booking_id)),
                now,
            )
            .await
            {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(StudioError::already_cancelled("Booking is already cancelled"));
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            debug!(
                "Booking {} cancelled without refund ({:?})",
                booking_id, decision
            );
        }

        let cancelled = booking::Entity::find_by_id(booking_id)
            .one(&txn)
            .await?
            .ok_or_else(|| StudioError::not_found("Booking not found"))?;
        let balance_after = balance_on(&txn, user_id).await?;

        txn.commit()
            .await
            .map_err(|e| StudioError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Booking {} cancelled by user {} (refunded: {})",
            booking_id, user_id, refund
        );
        Ok((model_to_booking(cancelled), refund, balance_after))
    }

    pub async fn get_booking(&self, booking_id: i32) -> Result<Option<Booking>> {
        Ok(booking::Entity::find_by_id(booking_id)
            .one(&self.db)
            .await?
            .map(model_to_booking))
    }

    /// 今天及以后的有效预约，按日期和开始时间排序
    pub async fn upcoming_bookings(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<BookingDetail>> {
        let rows = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .filter(booking::Column::CancelledAt.is_null())
            .filter(booking::Column::BookingDate.gte(today))
            .all(&self.db)
            .await?;

        let mut details = load_details(&self.db, rows).await?;
        details.sort_by_key(|d| (d.booking.booking_date, d.start_time, d.booking.id));
        Ok(details)
    }

    /// 全部预约，最新在前
    pub async fn booking_history(&self, user_id: &str) -> Result<Vec<BookingDetail>> {
        let rows = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;

        let mut details = load_details(&self.db, rows).await?;
        details.sort_by(|a, b| {
            (b.booking.booking_date, b.start_time, b.booking.id).cmp(&(
                a.booking.booking_date,
                a.start_time,
                a.booking.id,
            ))
        });
        Ok(details)
    }

    /// 截止到某天（含）的有效预约，用于统计
    pub async fn attended_bookings(
        &self,
        user_id: &str,
        until: NaiveDate,
    ) -> Result<Vec<BookingDetail>> {
        let rows = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .filter(booking::Column::CancelledAt.is_null())
            .filter(booking::Column::BookingDate.lte(until))
            .all(&self.db)
            .await?;
        load_details(&self.db, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    #[test]
    fn test_cancel_well_before_start_is_refundable() {
        let decision = cancellation_decision(at(18, 0), at(16, 0), Duration::minutes(60));
        assert_eq!(decision.unwrap(), CancelDecision::Refundable);
        let edge = cancellation_decision(at(18, 0), at(17, 0), Duration::minutes(60));
        assert_eq!(edge.unwrap(), CancelDecision::Refundable);
    }

    #[test]
    fn test_cancel_inside_window_is_rejected() {
        for now in [at(17, 1), at(18, 0), at(18, 59), at(19, 0)] {
            let err =
                cancellation_decision(at(18, 0), now, Duration::minutes(60)).unwrap_err();
            assert!(matches!(err, StudioError::CancellationWindow(_)));
            assert_eq!(err.message(), "Cannot cancel within 1 hour of class start");
        }
    }

    #[test]
    fn test_cancel_long_after_start_has_no_refund() {
        let decision = cancellation_decision(at(18, 0), at(19, 1), Duration::minutes(60));
        assert_eq!(decision.unwrap(), CancelDecision::NoRefund);
    }

    #[test]
    fn test_window_label() {
        assert_eq!(window_label(Duration::minutes(60)), "1 hour");
        assert_eq!(window_label(Duration::minutes(120)), "2 hours");
        assert_eq!(window_label(Duration::minutes(45)), "45 minutes");
    }

    #[test]
    fn test_keys_and_slot() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(active_slot("u1", 4, date), "u1:4:2025-06-02");
        assert_eq!(booking_key(7), "booking:7");
        assert_eq!(refund_key(7), "refund:7");
    }
}
