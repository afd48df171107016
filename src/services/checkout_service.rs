//! Pass checkout
//!
//! Creates a hosted payment page for a pass. Credits are only granted later,
//! when the payment provider confirms the payment through the webhook.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::payment::{CheckoutSessionRequest, PaymentGateway};
use crate::config::StripeConfig;
use crate::errors::{Result, StudioError};
use crate::storage::SeaOrmStorage;
use crate::utils::validate_return_url;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub pass_id: i32,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

pub struct CheckoutService {
    storage: Arc<SeaOrmStorage>,
    gateway: Arc<dyn PaymentGateway>,
    default_success_url: Option<String>,
    default_cancel_url: Option<String>,
}

impl CheckoutService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        gateway: Arc<dyn PaymentGateway>,
        config: &StripeConfig,
    ) -> Self {
        Self {
            storage,
            gateway,
            default_success_url: config.default_success_url.clone(),
            default_cancel_url: config.default_cancel_url.clone(),
        }
    }

    fn resolve_url(field: &str, given: Option<&str>, fallback: Option<&str>) -> Result<String> {
        let raw = given
            .filter(|u| !u.trim().is_empty())
            .or(fallback)
            .ok_or_else(|| StudioError::validation(format!("{} is required", field)))?;
        validate_return_url(raw)
            .map(|u| u.to_string())
            .map_err(|e| StudioError::validation(format!("{}: {}", field, e)))
    }

    pub async fn create_checkout(
        &self,
        user_id: &str,
        req: CheckoutRequest,
    ) -> Result<CheckoutResponse> {
        let success_url = Self::resolve_url(
            "success_url",
            req.success_url.as_deref(),
            self.default_success_url.as_deref(),
        )?;
        let cancel_url = Self::resolve_url(
            "cancel_url",
            req.cancel_url.as_deref(),
            self.default_cancel_url.as_deref(),
        )?;

        let pass = self
            .storage
            .get_pass(req.pass_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| StudioError::not_found("Pass not found"))?;

        let profile = self
            .storage
            .get_profile(user_id)
            .await?
            .ok_or_else(|| StudioError::not_found("Profile not found"))?;

        let customer_id = match profile.stripe_customer_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                let id = self
                    .gateway
                    .create_customer(&profile.email, user_id)
                    .await?;
                self.storage.set_stripe_customer_id(user_id, &id).await?;
                info!(
                    "CheckoutService: created {} customer {} for user {}",
                    self.gateway.name(),
                    id,
                    user_id
                );
                id
            }
        };

        let session = self
            .gateway
            .create_checkout_session(CheckoutSessionRequest {
                customer_id,
                price_id: pass.stripe_price_id.clone(),
                success_url,
                cancel_url,
                user_id: user_id.to_string(),
                pass_id: pass.id,
            })
            .await?;

        info!(
            "CheckoutService: session {} opened for user {} (pass {})",
            session.id, user_id, pass.id
        );
        Ok(CheckoutResponse {
            url: session.url,
            session_id: session.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url_prefers_given() {
        let url = CheckoutService::resolve_url(
            "success_url",
            Some("https://a.example/ok"),
            Some("https://b.example/ok"),
        )
        .unwrap();
        assert_eq!(url, "https://a.example/ok");
    }

    #[test]
    fn test_resolve_url_falls_back() {
        let url =
            CheckoutService::resolve_url("cancel_url", Some("  "), Some("https://b.example/no"))
                .unwrap();
        assert_eq!(url, "https://b.example/no");
    }

    #[test]
    fn test_resolve_url_rejects_missing_and_invalid() {
        assert!(CheckoutService::resolve_url("success_url", None, None).is_err());
        let err =
            CheckoutService::resolve_url("success_url", Some("ftp://x.example"), None).unwrap_err();
        assert!(err.message().starts_with("success_url:"));
    }
}
