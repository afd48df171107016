//! Stripe REST 客户端
//!
//! 使用 ureq 同步请求，在 spawn_blocking 中执行。请求体为表单编码。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use ureq::Agent;

use super::{CheckoutSession, CheckoutSessionRequest, PaymentGateway};
use crate::config::StripeConfig;
use crate::errors::{Result, StudioError};

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct StripeGateway {
    agent: Agent,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }

    fn ensure_key(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            return Err(StudioError::configuration("Stripe key not configured"));
        }
        Ok(())
    }

    /// 同步 POST 表单（在 spawn_blocking 中调用）
    fn post_form_sync<T: for<'de> Deserialize<'de>>(
        agent: Agent,
        url: String,
        secret_key: String,
        form: Vec<(String, String)>,
    ) -> Result<T> {
        let mut resp = agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", secret_key))
            .send_form(form)
            .map_err(|e| {
                warn!("Stripe request to {} failed: {}", url, e);
                StudioError::payment_provider(format!("Stripe request failed: {}", e))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .body_mut()
                .read_json::<ErrorEnvelope>()
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!("Stripe returned {} for {}: {}", status, url, message);
            return Err(StudioError::payment_provider(message));
        }

        resp.body_mut().read_json::<T>().map_err(|e| {
            StudioError::payment_provider(format!("Invalid Stripe response: {}", e))
        })
    }

    async fn post_form<T>(&self, path: &str, form: Vec<(String, String)>) -> Result<T>
    where
        T: for<'de> Deserialize<'de> + Send + 'static,
    {
        self.ensure_key()?;
        let agent = self.agent.clone();
        let url = format!("{}{}", self.api_base, path);
        let key = self.secret_key.clone();
        debug!("Stripe POST {}", path);

        tokio::task::spawn_blocking(move || Self::post_form_sync::<T>(agent, url, key, form))
            .await
            .map_err(|e| StudioError::payment_provider(format!("Stripe task failed: {}", e)))?
    }
}

/// 结账会话表单字段
pub(crate) fn checkout_form(req: &CheckoutSessionRequest) -> Vec<(String, String)> {
    vec![
        ("mode".to_string(), "payment".to_string()),
        ("customer".to_string(), req.customer_id.clone()),
        ("line_items[0][price]".to_string(), req.price_id.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("success_url".to_string(), req.success_url.clone()),
        ("cancel_url".to_string(), req.cancel_url.clone()),
        ("client_reference_id".to_string(), req.user_id.clone()),
        ("metadata[user_id]".to_string(), req.user_id.clone()),
        ("metadata[pass_id]".to_string(), req.pass_id.to_string()),
    ]
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String> {
        let form = vec![
            ("email".to_string(), email.to_string()),
            ("metadata[user_id]".to_string(), user_id.to_string()),
        ];
        let customer: CustomerResponse = self.post_form("/v1/customers", form).await?;
        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        req: CheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        let session: SessionResponse = self
            .post_form("/v1/checkout/sessions", checkout_form(&req))
            .await?;
        let url = session
            .url
            .ok_or_else(|| StudioError::payment_provider("Stripe session has no URL"))?;
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    fn name(&self) -> &'static str {
        "Stripe"
    }
}
