//! Payment webhook
//!
//! Verifies the `Stripe-Signature` header and turns completed checkout sessions
//! into purchases plus ledger credits. Replayed events are acknowledged without
//! writing anything.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::config::StripeConfig;
use crate::errors::{Result, StudioError};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::NewPurchase;

type HmacSha256 = Hmac<Sha256>;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

fn compute_signature(payload: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StudioError::configuration(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

/// 生成签名头（测试和本地调试用）
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    Ok(format!(
        "t={},v1={}",
        timestamp,
        compute_signature(payload, secret, timestamp)?
    ))
}

/// 校验 `t=<unix>,v1=<hex>[,v1=...]`
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: u64,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StudioError::webhook_signature("Missing timestamp in signature header"))?;
    if candidates.is_empty() {
        return Err(StudioError::webhook_signature(
            "No v1 signature in signature header",
        ));
    }

    let age = now.timestamp() - timestamp;
    if age.unsigned_abs() > tolerance_secs {
        return Err(StudioError::webhook_signature(
            "Timestamp outside the tolerance zone",
        ));
    }

    let expected = compute_signature(payload, secret, timestamp)?;
    let matched = candidates
        .iter()
        .any(|c| bool::from(c.as_bytes().ct_eq(expected.as_bytes())));
    if !matched {
        return Err(StudioError::webhook_signature(
            "No signatures found matching the expected signature for payload",
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletedSession {
    id: String,
    #[serde(default)]
    payment_intent: Option<serde_json::Value>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

impl CompletedSession {
    /// payment_intent 可能是字符串或展开的对象，缺失时用会话 id
    fn payment_reference(&self) -> String {
        match &self.payment_intent {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Object(obj)) => obj
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| self.id.clone()),
            _ => self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebhookOutcome {
    pub received: bool,
    pub event_type: String,
    /// 本次是否新入账
    pub recorded: bool,
}

pub struct WebhookService {
    storage: Arc<SeaOrmStorage>,
    secret: String,
    tolerance_secs: u64,
}

impl WebhookService {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &StripeConfig) -> Self {
        Self {
            storage,
            secret: config.webhook_secret.clone(),
            tolerance_secs: config.webhook_tolerance_secs,
        }
    }

    pub async fn handle(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookOutcome> {
        self.handle_at(payload, signature, Utc::now()).await
    }

    pub async fn handle_at(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<WebhookOutcome> {
        if self.secret.is_empty() {
            return Err(StudioError::configuration("Webhook secret not configured"));
        }
        let signature = signature
            .ok_or_else(|| StudioError::webhook_signature("Missing Stripe-Signature header"))?;
        verify_signature(payload, signature, &self.secret, self.tolerance_secs, now)?;

        let event: WebhookEvent = serde_json::from_slice(payload)?;
        debug!("Webhook event {} ({})", event.id, event.event_type);

        if event.event_type != CHECKOUT_COMPLETED {
            return Ok(WebhookOutcome {
                received: true,
                event_type: event.event_type,
                recorded: false,
            });
        }

        let session: CompletedSession = serde_json::from_value(event.data.object)?;
        let recorded = self.complete_checkout(&session, now).await?;
        Ok(WebhookOutcome {
            received: true,
            event_type: event.event_type,
            recorded,
        })
    }

    async fn complete_checkout(&self, session: &CompletedSession, now: DateTime<Utc>) -> Result<bool> {
        let user_id = session
            .metadata
            .get("user_id")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| StudioError::validation("Missing user_id in session metadata"))?;
        let pass_id: i32 = session
            .metadata
            .get("pass_id")
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| StudioError::validation("Missing pass_id in session metadata"))?;

        let pass = self
            .storage
            .get_pass(pass_id)
            .await?
            .ok_or_else(|| StudioError::validation("Pass not found"))?;

        let reference = session.payment_reference();
        let recorded = self
            .storage
            .record_purchase(NewPurchase {
                user_id,
                pass: &pass,
                payment_reference: &reference,
                purchased_at: now,
            })
            .await?;

        match recorded {
            Some(purchase) => {
                info!(
                    "WebhookService: payment {} credited to user {} (purchase {})",
                    reference, user_id, purchase.id
                );
                Ok(true)
            }
            None => {
                warn!("WebhookService: replayed payment {} ignored", reference);
                Ok(false)
            }
        }
    }
}
