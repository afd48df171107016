//! API 模块常量定义

/// 用户 API 前缀（其下挂载 /v1）
pub const USER_API_PREFIX: &str = "/api";

/// 管理 API 前缀（其下挂载 /v1）
pub const ADMIN_API_PREFIX: &str = "/admin";

/// 健康检查前缀
pub const HEALTH_PREFIX: &str = "/health";

/// 支付 webhook 路径
pub const STRIPE_WEBHOOK_PATH: &str = "/webhooks/stripe";

/// Stripe 签名请求头
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// 普通 JSON 请求体上限
pub const JSON_PAYLOAD_LIMIT: usize = 64 * 1024;

/// webhook 原始请求体上限
pub const WEBHOOK_PAYLOAD_LIMIT: usize = 256 * 1024;

/// 导入记录列表默认条数
pub const RECENT_UPLOADS_LIMIT: u64 = 20;
