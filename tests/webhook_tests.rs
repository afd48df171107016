//! Stripe webhook tests
//!
//! Signed events are replayed against a temporary SQLite database.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde_json::json;
use studiopass::config::StripeConfig;
use studiopass::errors::StudioError;
use studiopass::services::webhook_service::sign_payload;
use studiopass::services::WebhookService;
use studiopass::storage::{Pass, PassDraft, SeaOrmStorage};
use tempfile::TempDir;

const SECRET: &str = "whsec_integration";
const USER: &str = "8c7f3c1e-4a52-4c1b-9a53-1f2b9b6f0a01";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap()
}

async fn setup(secret: &str) -> (WebhookService, Arc<SeaOrmStorage>, Pass, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("webhook_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("Failed to create storage"),
    );

    let pass = storage
        .upsert_pass(&PassDraft {
            id: None,
            name: "10 Class Pack".to_string(),
            description: None,
            credits: 10,
            unlimited: false,
            validity_days: None,
            stripe_price_id: "price_ten".to_string(),
            is_active: true,
            price_cents: Some(16000),
            currency: Some("usd".to_string()),
        })
        .await
        .unwrap();

    let config = StripeConfig {
        webhook_secret: secret.to_string(),
        ..Default::default()
    };
    let service = WebhookService::new(storage.clone(), &config);
    (service, storage, pass, temp_dir)
}

fn completed_event(pass_id: i32, payment_intent: serde_json::Value) -> Vec<u8> {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_1",
                "payment_intent": payment_intent,
                "metadata": {
                    "user_id": USER,
                    "pass_id": pass_id.to_string(),
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}

fn signed(payload: &[u8]) -> String {
    sign_payload(payload, SECRET, now().timestamp()).unwrap()
}

#[tokio::test]
async fn test_completed_checkout_credits_pass() {
    let (service, storage, pass, _dir) = setup(SECRET).await;
    let payload = completed_event(pass.id, json!("pi_123"));

    let outcome = service
        .handle_at(&payload, Some(&signed(&payload)), now())
        .await
        .unwrap();
    assert!(outcome.received);
    assert!(outcome.recorded);
    assert_eq!(outcome.event_type, "checkout.session.completed");

    assert_eq!(storage.balance(USER).await.unwrap(), 10);
    let ledger = storage.ledger_entries(USER).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].reason, "pass_purchase");
    assert_eq!(ledger[0].pass_id, Some(pass.id));
}

#[tokio::test]
async fn test_replayed_event_is_acknowledged_once() {
    let (service, storage, pass, _dir) = setup(SECRET).await;
    let payload = completed_event(pass.id, json!("pi_replay"));
    let header = signed(&payload);

    let first = service
        .handle_at(&payload, Some(&header), now())
        .await
        .unwrap();
    let second = service
        .handle_at(&payload, Some(&header), now())
        .await
        .unwrap();

    assert!(first.recorded);
    assert!(second.received);
    assert!(!second.recorded);
    assert_eq!(storage.balance(USER).await.unwrap(), 10);
}

#[tokio::test]
async fn test_expanded_payment_intent_object() {
    let (service, storage, pass, _dir) = setup(SECRET).await;
    let first = completed_event(pass.id, json!({"id": "pi_expanded", "object": "payment_intent"}));
    let second = completed_event(pass.id, json!("pi_expanded"));

    service
        .handle_at(&first, Some(&signed(&first)), now())
        .await
        .unwrap();
    let outcome = service
        .handle_at(&second, Some(&signed(&second)), now())
        .await
        .unwrap();

    // 同一个 payment_intent，不论是否展开都只入账一次
    assert!(!outcome.recorded);
    assert_eq!(storage.balance(USER).await.unwrap(), 10);
}

#[tokio::test]
async fn test_missing_payment_intent_falls_back_to_session_id() {
    let (service, storage, pass, _dir) = setup(SECRET).await;
    let payload = completed_event(pass.id, serde_json::Value::Null);

    let outcome = service
        .handle_at(&payload, Some(&signed(&payload)), now())
        .await
        .unwrap();
    assert!(outcome.recorded);

    let summary = storage
        .credit_summary(USER, now().date_naive(), FixedOffset::east_opt(0).unwrap())
        .await
        .unwrap();
    assert_eq!(summary.purchases.len(), 1);
    assert_eq!(summary.purchases[0].credits_added, 10);
}

#[tokio::test]
async fn test_tampered_payload_is_rejected() {
    let (service, storage, pass, _dir) = setup(SECRET).await;
    let payload = completed_event(pass.id, json!("pi_123"));
    let header = signed(&payload);
    let tampered = completed_event(pass.id, json!("pi_999"));

    let err = service
        .handle_at(&tampered, Some(&header), now())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::WebhookSignature(_)));
    assert_eq!(err.http_status().as_u16(), 400);
    assert_eq!(storage.balance(USER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stale_timestamp_is_rejected() {
    let (service, _storage, pass, _dir) = setup(SECRET).await;
    let payload = completed_event(pass.id, json!("pi_123"));
    let header = signed(&payload);

    let err = service
        .handle_at(&payload, Some(&header), now() + chrono::Duration::minutes(10))
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::WebhookSignature(_)));
}

#[tokio::test]
async fn test_missing_signature_header() {
    let (service, _storage, pass, _dir) = setup(SECRET).await;
    let payload = completed_event(pass.id, json!("pi_123"));

    let err = service.handle_at(&payload, None, now()).await.unwrap_err();
    assert!(matches!(err, StudioError::WebhookSignature(_)));
}

#[tokio::test]
async fn test_unconfigured_secret_is_server_error() {
    let (service, _storage, pass, _dir) = setup("").await;
    let payload = completed_event(pass.id, json!("pi_123"));

    let err = service
        .handle_at(&payload, Some(&signed(&payload)), now())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Configuration(_)));
    assert_eq!(err.http_status().as_u16(), 500);
}

#[tokio::test]
async fn test_other_event_types_are_acknowledged() {
    let (service, storage, _pass, _dir) = setup(SECRET).await;
    let payload = json!({
        "id": "evt_2",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string()
    .into_bytes();

    let outcome = service
        .handle_at(&payload, Some(&signed(&payload)), now())
        .await
        .unwrap();
    assert!(outcome.received);
    assert!(!outcome.recorded);
    assert_eq!(storage.balance(USER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_pass_is_rejected() {
    let (service, storage, _pass, _dir) = setup(SECRET).await;
    let payload = completed_event(4242, json!("pi_404"));

    let err = service
        .handle_at(&payload, Some(&signed(&payload)), now())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Validation(_)));
    assert_eq!(storage.balance(USER).await.unwrap(), 0);
}
