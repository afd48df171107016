use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 积分流水原因
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LedgerReason {
    PassPurchase,
    UnlimitedPassPurchase,
    ClassBooking,
    ClassCancellation,
    ManualAdjustment,
}

/// 课程难度
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
pub enum ClassLevel {
    #[serde(rename = "Beginner")]
    #[strum(serialize = "Beginner", ascii_case_insensitive)]
    Beginner,
    #[serde(rename = "Intermediate")]
    #[strum(serialize = "Intermediate", ascii_case_insensitive)]
    Intermediate,
    #[serde(rename = "Advanced")]
    #[strum(serialize = "Advanced", ascii_case_insensitive)]
    Advanced,
    #[default]
    #[serde(rename = "All Levels")]
    #[strum(serialize = "All Levels", ascii_case_insensitive)]
    AllLevels,
}

/// CSV 导入状态
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub waiver_accepted: bool,
    pub waiver_accepted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    pub weekly_goal: i32,
    pub monthly_goal: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 档案可修改字段，None 表示不修改
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub waiver_accepted: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Goals {
    pub weekly_goal: i32,
    pub monthly_goal: i32,
}

/// 可购买的积分包
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pass {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub credits: i32,
    pub unlimited: bool,
    pub validity_days: Option<i32>,
    pub stripe_price_id: String,
    pub is_active: bool,
    pub price_cents: Option<i32>,
    pub currency: Option<String>,
}

/// 新建或更新积分包（id 为空时新建）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassDraft {
    pub id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub credits: i32,
    #[serde(default)]
    pub unlimited: bool,
    pub validity_days: Option<i32>,
    pub stripe_price_id: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub price_cents: Option<i32>,
    pub currency: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Purchase {
    pub id: i32,
    pub user_id: String,
    pub pass_id: i32,
    pub payment_reference: String,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: i32,
    pub user_id: String,
    pub pass_id: Option<i32>,
    pub delta: i32,
    pub reason: String,
    pub ref_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// 购买历史中的一条
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseRecord {
    pub purchase_id: i32,
    pub pass_id: i32,
    pub pass_name: String,
    pub credits_added: i32,
    pub unlimited: bool,
    pub purchased_at: DateTime<Utc>,
}

/// 积分概览
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreditSummary {
    pub balance: i64,
    pub total_purchased: i64,
    pub classes_used: i64,
    pub has_unlimited: bool,
    /// 最新有效无限卡的到期日（不含），None 表示无到期或没有无限卡
    pub unlimited_until: Option<NaiveDate>,
    pub purchases: Vec<PurchaseRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassInfo {
    pub id: i32,
    pub class_name: String,
    pub description: Option<String>,
    pub instructor: String,
    pub level: String,
    pub temperature_cel: Option<i32>,
    pub duration_minute: i32,
    pub max_capacity: i32,
    pub is_active: bool,
}

/// 课表导入时的课程数据（按 class_name 合并）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDraft {
    pub class_name: String,
    pub description: Option<String>,
    pub instructor: String,
    pub level: ClassLevel,
    pub temperature_cel: Option<i32>,
    pub duration_minute: i32,
    pub max_capacity: i32,
}

/// 课表导入时的时段数据（按 class_id + day_of_week + start_time 合并）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDraft {
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassSession {
    pub id: i32,
    pub class_id: i32,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: i32,
    pub user_id: String,
    pub class_id: i32,
    pub session_id: i32,
    pub booking_date: NaiveDate,
    pub booked_at: DateTime<Utc>,
    pub credits_charged: i32,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by_user: Option<bool>,
    pub credit_refunded: bool,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.cancelled_at.is_none()
    }
}

/// 预约 + 课程 + 时段（用于列表展示和统计）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub class_name: String,
    pub instructor: String,
    pub level: String,
    pub temperature_cel: Option<i32>,
    pub duration_minute: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsvUpload {
    pub id: i32,
    pub filename: String,
    pub uploaded_by: String,
    pub status: String,
    pub total_classes: i32,
    pub processed_classes: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 预约规则：场馆时区与取消窗口
#[derive(Debug, Clone, Copy)]
pub struct BookingRules {
    pub offset: FixedOffset,
    pub cancellation_window: Duration,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(0).unwrap_or(Utc.fix()),
            cancellation_window: Duration::minutes(60),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageConfig {
    pub storage_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ledger_reason_strings() {
        assert_eq!(LedgerReason::ClassBooking.as_ref(), "class_booking");
        assert_eq!(
            LedgerReason::UnlimitedPassPurchase.to_string(),
            "unlimited_pass_purchase"
        );
        assert_eq!(
            LedgerReason::from_str("class_cancellation").unwrap(),
            LedgerReason::ClassCancellation
        );
    }

    #[test]
    fn test_class_level_parse() {
        assert_eq!(ClassLevel::from_str("All Levels").unwrap(), ClassLevel::AllLevels);
        assert_eq!(ClassLevel::from_str("beginner").unwrap(), ClassLevel::Beginner);
        assert!(ClassLevel::from_str("Expert").is_err());
        assert_eq!(ClassLevel::default().as_ref(), "All Levels");
    }

    #[test]
    fn test_upload_status_strings() {
        assert_eq!(UploadStatus::Processing.as_ref(), "processing");
        assert_eq!(UploadStatus::from_str("failed").unwrap(), UploadStatus::Failed);
    }
}
