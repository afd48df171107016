//! Booking ledger service
//!
//! Booking, cancellation and credit queries shared by the HTTP API and the CLI.
//! Every method has an `_at` variant taking an explicit clock for tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::BookingConfig;
use crate::errors::{Result, StudioError};
use crate::storage::backend::NewBooking;
use crate::storage::{
    Booking, BookingDetail, BookingRules, CreditSummary, LedgerEntry, SeaOrmStorage,
};
use crate::utils::time::{studio_offset, studio_today};

/// 单次人工调整的上限
const MAX_MANUAL_ADJUSTMENT: i32 = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BookClassRequest {
    pub session_id: i32,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub balance_after: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub booking: Booking,
    pub refunded: bool,
    pub balance_after: i64,
}

pub struct BookingService {
    storage: Arc<SeaOrmStorage>,
    rules: BookingRules,
}

impl BookingService {
    pub fn new(storage: Arc<SeaOrmStorage>, rules: BookingRules) -> Self {
        Self { storage, rules }
    }

    pub fn from_config(storage: Arc<SeaOrmStorage>, config: &BookingConfig) -> Result<Self> {
        if config.cancellation_window_minutes < 0 {
            return Err(StudioError::validation(
                "booking.cancellation_window_minutes must not be negative",
            ));
        }
        let rules = BookingRules {
            offset: studio_offset(config.utc_offset_minutes)?,
            cancellation_window: Duration::minutes(config.cancellation_window_minutes),
        };
        Ok(Self::new(storage, rules))
    }

    pub fn rules(&self) -> BookingRules {
        self.rules
    }

    pub fn today(&self) -> NaiveDate {
        studio_today(Utc::now(), self.rules.offset)
    }

    pub async fn balance(&self, user_id: &str) -> Result<i64> {
        self.storage.balance(user_id).await
    }

    pub async fn credit_summary(&self, user_id: &str) -> Result<CreditSummary> {
        self.storage
            .credit_summary(user_id, self.today(), self.rules.offset)
            .await
    }

    pub async fn ledger(&self, user_id: &str) -> Result<Vec<LedgerEntry>> {
        self.storage.ledger_entries(user_id).await
    }

    pub async fn book_class(&self, user_id: &str, req: BookClassRequest) -> Result<BookingOutcome> {
        self.book_class_at(user_id, req, Utc::now()).await
    }

    pub async fn book_class_at(
        &self,
        user_id: &str,
        req: BookClassRequest,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome> {
        let result = self
            .storage
            .book_class(NewBooking {
                user_id,
                session_id: req.session_id,
                booking_date: req.date,
                now,
                rules: self.rules,
            })
            .await;

        match result {
            Ok((booking, balance_after)) => Ok(BookingOutcome {
                booking,
                balance_after,
            }),
            Err(e) => {
                warn!(
                    "BookingService: booking rejected for user {} (session {}, {}): {}",
                    user_id, req.session_id, req.date, e
                );
                Err(e)
            }
        }
    }

    pub async fn cancel_booking(&self, user_id: &str, booking_id: i32) -> Result<CancelOutcome> {
        self.cancel_booking_at(user_id, booking_id, Utc::now()).await
    }

    pub async fn cancel_booking_at(
        &self,
        user_id: &str,
        booking_id: i32,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome> {
        let (booking, refunded, balance_after) = self
            .storage
            .cancel_booking(user_id, booking_id, now, self.rules)
            .await?;
        Ok(CancelOutcome {
            booking,
            refunded,
            balance_after,
        })
    }

    pub async fn upcoming_bookings(&self, user_id: &str) -> Result<Vec<BookingDetail>> {
        self.storage.upcoming_bookings(user_id, self.today()).await
    }

    pub async fn upcoming_bookings_on(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<BookingDetail>> {
        self.storage.upcoming_bookings(user_id, today).await
    }

    pub async fn booking_history(&self, user_id: &str) -> Result<Vec<BookingDetail>> {
        self.storage.booking_history(user_id).await
    }

    /// 人工调整积分（管理端）
    pub async fn grant_credits(
        &self,
        user_id: &str,
        delta: i32,
        note: Option<&str>,
    ) -> Result<LedgerEntry> {
        if delta == 0 {
            return Err(StudioError::validation("delta must not be zero"));
        }
        if delta.abs() > MAX_MANUAL_ADJUSTMENT {
            return Err(StudioError::validation(format!(
                "delta must be within ±{}",
                MAX_MANUAL_ADJUSTMENT
            )));
        }
        uuid::Uuid::parse_str(user_id)
            .map_err(|_| StudioError::validation("user_id must be a UUID"))?;

        let entry = self.storage.grant_credits(user_id, delta, Utc::now()).await?;
        info!(
            "BookingService: manual adjustment {:+} for user {} ({})",
            delta,
            user_id,
            note.unwrap_or("no note")
        );
        Ok(entry)
    }
}
