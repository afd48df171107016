//! 支付 webhook 端点
//!
//! 需要原始请求体做签名校验，因此直接读取 `web::Bytes`。响应保持
//! `{ "received": true }` / `{ "error": ... }` 的形式。

use actix_web::{HttpRequest, HttpResponse, Responder, Result as ActixResult, web};
use serde_json::json;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::api::constants::{STRIPE_SIGNATURE_HEADER, STRIPE_WEBHOOK_PATH, WEBHOOK_PAYLOAD_LIMIT};
use crate::services::WebhookService;

pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    webhooks: web::Data<Arc<WebhookService>>,
) -> ActixResult<impl Responder> {
    let signature = req
        .headers()
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok());

    match webhooks.handle(&body, signature).await {
        Ok(outcome) => {
            trace!(
                "Webhook {} handled (recorded: {})",
                outcome.event_type, outcome.recorded
            );
            Ok(HttpResponse::Ok().json(json!({ "received": true })))
        }
        Err(e) => {
            warn!("Webhook rejected: {}", e);
            Ok(HttpResponse::build(e.http_status()).json(json!({ "error": e.message() })))
        }
    }
}

/// webhook 路由（不经过用户或管理员鉴权）
pub fn webhook_routes() -> actix_web::Resource {
    web::resource(STRIPE_WEBHOOK_PATH)
        .app_data(web::PayloadConfig::new(WEBHOOK_PAYLOAD_LIMIT))
        .route(web::post().to(stripe_webhook))
}
