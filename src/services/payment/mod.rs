//! 支付网关抽象
//!
//! 线上使用 Stripe，测试中替换为内存实现。

mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub use stripe::StripeGateway;

/// 创建结账会话所需参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub user_id: String,
    pub pass_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// 创建支付方客户，返回客户 id
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String>;

    async fn create_checkout_session(&self, req: CheckoutSessionRequest)
    -> Result<CheckoutSession>;

    fn name(&self) -> &'static str;
}
