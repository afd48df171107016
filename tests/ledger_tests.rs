//! Credit ledger and booking tests
//!
//! Runs BookingService against temporary SQLite databases with fixed clocks.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use studiopass::errors::StudioError;
use studiopass::services::{BookClassRequest, BookingService};
use studiopass::storage::backend::NewPurchase;
use studiopass::storage::{
    BookingRules, ClassDraft, ClassLevel, PassDraft, SeaOrmStorage, SessionDraft,
};
use tempfile::TempDir;

const USER: &str = "8c7f3c1e-4a52-4c1b-9a53-1f2b9b6f0a01";
const OTHER_USER: &str = "0d9e6f1a-2b3c-4d5e-8f90-a1b2c3d4e5f6";

/// 2025-06-02 是周一
fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
}

/// 周三 18:00 开课
fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
}

fn class_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 4, 18, 0, 0).unwrap()
}

fn rules() -> BookingRules {
    BookingRules {
        offset: FixedOffset::east_opt(0).unwrap(),
        cancellation_window: Duration::minutes(60),
    }
}

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("ledger_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");
    (Arc::new(storage), temp_dir)
}

/// 建一门周三 18:00 的课，返回时段 id
async fn seed_session(storage: &SeaOrmStorage, name: &str, capacity: i32) -> i32 {
    let now = monday_morning();
    let class = SeaOrmStorage::upsert_class(
        storage.get_db(),
        &ClassDraft {
            class_name: name.to_string(),
            description: None,
            instructor: "Maya".to_string(),
            level: ClassLevel::AllLevels,
            temperature_cel: Some(38),
            duration_minute: 60,
            max_capacity: capacity,
        },
        now,
    )
    .await
    .expect("Failed to create class");

    let session = SeaOrmStorage::upsert_session(
        storage.get_db(),
        class.id,
        &SessionDraft {
            day_of_week: 3,
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        },
        now,
    )
    .await
    .expect("Failed to create session");
    session.id
}

async fn setup(capacity: i32) -> (BookingService, Arc<SeaOrmStorage>, i32, TempDir) {
    let (storage, dir) = create_temp_storage().await;
    let session_id = seed_session(&storage, "Hot Flow", capacity).await;
    let service = BookingService::new(storage.clone(), rules());
    (service, storage, session_id, dir)
}

fn request(session_id: i32) -> BookClassRequest {
    BookClassRequest {
        session_id,
        date: wednesday(),
    }
}

#[tokio::test]
async fn test_booking_spends_one_credit() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 2, monday_morning())
        .await
        .unwrap();

    let outcome = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();

    assert_eq!(outcome.booking.credits_charged, 1);
    assert_eq!(outcome.balance_after, 1);
    assert!(outcome.booking.is_active());
    assert_eq!(service.balance(USER).await.unwrap(), 1);

    let ledger = service.ledger(USER).await.unwrap();
    let booking_entry = ledger
        .iter()
        .find(|e| e.reason == "class_booking")
        .expect("booking entry");
    assert_eq!(booking_entry.delta, -1);
    assert_eq!(booking_entry.ref_id, Some(outcome.booking.id));
}

#[tokio::test]
async fn test_booking_without_credits_is_rejected() {
    let (service, _storage, session_id, _dir) = setup(10).await;

    let err = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::InsufficientCredits(_)));
    assert_eq!(err.http_status().as_u16(), 402);

    assert!(service.ledger(USER).await.unwrap().is_empty());
    assert!(service.booking_history(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_booking_is_rejected() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 5, monday_morning())
        .await
        .unwrap();

    service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();
    let err = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::AlreadyBooked(_)));
    assert_eq!(service.balance(USER).await.unwrap(), 4);
}

#[tokio::test]
async fn test_full_class_is_rejected() {
    let (service, storage, session_id, _dir) = setup(1).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();
    storage
        .grant_credits(OTHER_USER, 1, monday_morning())
        .await
        .unwrap();

    service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();
    let err = service
        .book_class_at(OTHER_USER, request(session_id), monday_morning())
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::ClassFull(_)));
    assert_eq!(service.balance(OTHER_USER).await.unwrap(), 1);
}

#[tokio::test]
async fn test_booking_on_wrong_weekday_is_rejected() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();

    let err = service
        .book_class_at(
            USER,
            BookClassRequest {
                session_id,
                date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            },
            monday_morning(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Validation(_)));
}

#[tokio::test]
async fn test_booking_started_class_is_rejected() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();

    let err = service
        .book_class_at(USER, request(session_id), class_start())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Validation(_)));
    assert_eq!(service.balance(USER).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (service, storage, _session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();

    let err = service
        .book_class_at(USER, request(9999), monday_morning())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::NotFound(_)));
}

#[tokio::test]
async fn test_cancel_before_window_refunds_once() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();
    let booked = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();
    assert_eq!(booked.balance_after, 0);

    let cancelled = service
        .cancel_booking_at(USER, booked.booking.id, class_start() - Duration::hours(2))
        .await
        .unwrap();
    assert!(cancelled.refunded);
    assert_eq!(cancelled.balance_after, 1);
    assert!(cancelled.booking.credit_refunded);
    assert_eq!(cancelled.booking.cancelled_by_user, Some(true));

    let err = service
        .cancel_booking_at(USER, booked.booking.id, class_start() - Duration::hours(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::AlreadyCancelled(_)));
    assert_eq!(service.balance(USER).await.unwrap(), 1);

    let refunds = service
        .ledger(USER)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.reason == "class_cancellation")
        .count();
    assert_eq!(refunds, 1);
}

#[tokio::test]
async fn test_rebook_after_cancel() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();
    let booked = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();
    service
        .cancel_booking_at(USER, booked.booking.id, monday_morning())
        .await
        .unwrap();

    let again = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();
    assert_ne!(again.booking.id, booked.booking.id);
    assert_eq!(again.balance_after, 0);
}

#[tokio::test]
async fn test_cancel_inside_window_is_rejected() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();
    let booked = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();

    for now in [
        class_start() - Duration::minutes(59),
        class_start(),
        class_start() + Duration::minutes(30),
    ] {
        let err = service
            .cancel_booking_at(USER, booked.booking.id, now)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::CancellationWindow(_)));
    }

    let history = service.booking_history(USER).await.unwrap();
    assert!(history[0].booking.is_active());
    assert_eq!(service.balance(USER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancel_long_after_class_does_not_refund() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();
    let booked = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();

    let cancelled = service
        .cancel_booking_at(USER, booked.booking.id, class_start() + Duration::hours(3))
        .await
        .unwrap();
    assert!(!cancelled.refunded);
    assert!(!cancelled.booking.credit_refunded);
    assert_eq!(cancelled.balance_after, 0);
}

#[tokio::test]
async fn test_cancel_other_users_booking_is_not_found() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();
    let booked = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();

    let err = service
        .cancel_booking_at(OTHER_USER, booked.booking.id, monday_morning())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::NotFound(_)));
}

#[tokio::test]
async fn test_unlimited_pass_books_without_credits() {
    let (service, storage, session_id, _dir) = setup(10).await;
    let pass = storage
        .upsert_pass(&PassDraft {
            id: None,
            name: "Unlimited Month".to_string(),
            description: None,
            credits: 0,
            unlimited: true,
            validity_days: Some(30),
            stripe_price_id: "price_unlimited".to_string(),
            is_active: true,
            price_cents: Some(14900),
            currency: Some("usd".to_string()),
        })
        .await
        .unwrap();
    storage
        .record_purchase(NewPurchase {
            user_id: USER,
            pass: &pass,
            payment_reference: "pi_unlimited",
            purchased_at: monday_morning(),
        })
        .await
        .unwrap()
        .expect("first purchase recorded");

    let outcome = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();
    assert_eq!(outcome.booking.credits_charged, 0);
    assert_eq!(outcome.balance_after, 0);

    // 无限卡预约取消不产生退款流水
    let cancelled = service
        .cancel_booking_at(USER, outcome.booking.id, monday_morning())
        .await
        .unwrap();
    assert!(!cancelled.refunded);
    assert_eq!(cancelled.balance_after, 0);

    let summary = storage
        .credit_summary(USER, wednesday(), rules().offset)
        .await
        .unwrap();
    assert!(summary.has_unlimited);
    assert_eq!(
        summary.unlimited_until,
        Some(NaiveDate::from_ymd_opt(2025, 7, 2).unwrap())
    );
}

#[tokio::test]
async fn test_purchase_replay_credits_once() {
    let (service, storage, _session_id, _dir) = setup(10).await;
    let pass = storage
        .upsert_pass(&PassDraft {
            id: None,
            name: "5 Class Pack".to_string(),
            description: None,
            credits: 5,
            unlimited: false,
            validity_days: None,
            stripe_price_id: "price_five".to_string(),
            is_active: true,
            price_cents: Some(9000),
            currency: Some("usd".to_string()),
        })
        .await
        .unwrap();

    let purchase = NewPurchase {
        user_id: USER,
        pass: &pass,
        payment_reference: "pi_replay",
        purchased_at: monday_morning(),
    };
    assert!(storage.record_purchase(purchase.clone()).await.unwrap().is_some());
    assert!(storage.record_purchase(purchase).await.unwrap().is_none());

    assert_eq!(service.balance(USER).await.unwrap(), 5);
    let summary = service.credit_summary(USER).await.unwrap();
    assert_eq!(summary.total_purchased, 5);
    assert_eq!(summary.purchases.len(), 1);
}

#[tokio::test]
async fn test_concurrent_cancel_refunds_at_most_once() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();
    let booked = service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();

    let service = Arc::new(service);
    let booking_id = booked.booking.id;
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .cancel_booking_at(USER, booking_id, monday_morning())
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    let mut already_cancelled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(StudioError::AlreadyCancelled(_)) => already_cancelled += 1,
            Err(e) => panic!("unexpected cancel error: {:?}", e),
        }
    }
    assert_eq!(succeeded, 1);
    assert_eq!(already_cancelled, 3);

    let refunds = service
        .ledger(USER)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.reason == "class_cancellation")
        .count();
    assert_eq!(refunds, 1);
    assert_eq!(service.balance(USER).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_booking_respects_capacity() {
    let (service, storage, session_id, _dir) = setup(2).await;
    let users: Vec<String> = (0..5)
        .map(|i| format!("00000000-0000-4000-8000-00000000000{}", i))
        .collect();
    for user in &users {
        storage
            .grant_credits(user, 1, monday_morning())
            .await
            .unwrap();
    }

    let service = Arc::new(service);
    let handles: Vec<_> = users
        .iter()
        .cloned()
        .map(|user| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .book_class_at(&user, request(session_id), monday_morning())
                    .await
            })
        })
        .collect();

    let mut booked = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(StudioError::ClassFull(_)) => full += 1,
            Err(e) => panic!("unexpected booking error: {:?}", e),
        }
    }
    assert_eq!(booked, 2);
    assert_eq!(full, 3);

    let mut total_balance = 0;
    for user in &users {
        total_balance += service.balance(user).await.unwrap();
    }
    assert_eq!(total_balance, 3);
}

#[tokio::test]
async fn test_concurrent_bookings_cannot_overspend() {
    let (service, storage, first_session, _dir) = setup(10).await;
    let second_session = seed_session(&storage, "Yin", 10).await;
    storage
        .ensure_profile(USER, "member@example.com", monday_morning())
        .await
        .unwrap();
    storage
        .grant_credits(USER, 1, monday_morning())
        .await
        .unwrap();

    let service = Arc::new(service);
    let handles: Vec<_> = [first_session, second_session]
        .into_iter()
        .map(|session_id| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .book_class_at(USER, request(session_id), monday_morning())
                    .await
            })
        })
        .collect();

    let mut booked = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(StudioError::InsufficientCredits(_)) => refused += 1,
            Err(e) => panic!("unexpected booking error: {:?}", e),
        }
    }
    assert_eq!(booked, 1);
    assert_eq!(refused, 1);
    assert_eq!(service.balance(USER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_booking_history_newest_first() {
    let (service, storage, session_id, _dir) = setup(10).await;
    storage
        .grant_credits(USER, 2, monday_morning())
        .await
        .unwrap();

    let later = wednesday() + Duration::days(7);
    service
        .book_class_at(USER, request(session_id), monday_morning())
        .await
        .unwrap();
    service
        .book_class_at(
            USER,
            BookClassRequest {
                session_id,
                date: later,
            },
            monday_morning(),
        )
        .await
        .unwrap();

    let history = service.booking_history(USER).await.unwrap();
    let dates: Vec<NaiveDate> = history.iter().map(|d| d.booking.booking_date).collect();
    assert_eq!(dates, vec![later, wednesday()]);

    let upcoming = service
        .upcoming_bookings_on(USER, monday_morning().date_naive())
        .await
        .unwrap();
    let dates: Vec<NaiveDate> = upcoming.iter().map(|d| d.booking.booking_date).collect();
    assert_eq!(dates, vec![wednesday(), later]);
}

#[tokio::test]
async fn test_unlimited_window_uses_studio_date() {
    let (storage, _dir) = create_temp_storage().await;
    let pass = storage
        .upsert_pass(&PassDraft {
            id: None,
            name: "Unlimited Day".to_string(),
            description: None,
            credits: 0,
            unlimited: true,
            validity_days: Some(1),
            stripe_price_id: "price_day".to_string(),
            is_active: true,
            price_cents: Some(3000),
            currency: Some("usd".to_string()),
        })
        .await
        .unwrap();
    // 2025-06-01 20:00 UTC 在 UTC+10 已是 06-02 清晨
    storage
        .record_purchase(NewPurchase {
            user_id: USER,
            pass: &pass,
            payment_reference: "pi_day",
            purchased_at: Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap(),
        })
        .await
        .unwrap();

    let offset = FixedOffset::east_opt(10 * 3600).unwrap();
    let studio_day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let summary = storage
        .credit_summary(USER, studio_day, offset)
        .await
        .unwrap();
    assert!(summary.has_unlimited);
    assert_eq!(
        summary.unlimited_until,
        Some(NaiveDate::from_ymd_opt(2025, 6, 3).unwrap())
    );
}
