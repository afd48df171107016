//! API 类型定义

use serde::{Deserialize, Serialize};

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// GET /schedule 查询参数
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ScheduleQuery {
    /// YYYY-MM-DD，缺省为场馆当天
    pub from: Option<String>,
    pub days: Option<u32>,
}

/// 管理员调整积分
#[derive(Deserialize, Clone, Debug)]
pub struct GrantCreditsRequest {
    pub user_id: String,
    pub delta: i32,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthStorageCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub storage: HealthStorageCheck,
    pub response_time_ms: u64,
}
