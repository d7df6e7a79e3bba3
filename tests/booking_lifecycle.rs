mod common;

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use laundry_booking::entities::booking::{self as booking_entity, BookingStatus};
use laundry_booking::entities::service;
use laundry_booking::services::admin;
use laundry_booking::services::booking::{self, BookingPatch, NewBooking, Requester};
use laundry_booking::AppError;

use common::{file_db, future_date, test_config, test_db, verified_user};

// Seeded catalog: 1 = Suits (3000 / 7000 express), 6 = Shirt (1500 / 3000)
const SUITS: i32 = 1;
const SHIRT: i32 = 6;

fn new_booking(service_id: i32, date: &str, time: &str) -> NewBooking {
    NewBooking {
        service_id,
        scheduled_date: date.to_string(),
        scheduled_time: time.to_string(),
        address: "KG 11 Ave, Kigali".to_string(),
        notes: Some("Gate code 1234".to_string()),
        express: false,
    }
}

fn guest(n: usize) -> Requester {
    Requester::Guest {
        name: format!("Guest {}", n),
        contact: format!("+25078800000{}", n),
    }
}

fn is_booking_code(code: &str) -> bool {
    code.strip_prefix("CL-").is_some_and(|rest| {
        rest.len() == 5
            && rest
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    })
}

#[tokio::test]
async fn test_create_then_find_returns_input() {
    let db = test_db().await;
    let config = test_config();
    let policy = config.booking_policy();
    let user_id = verified_user(&db, &config, "+250788123456").await;
    let date = future_date(3);

    let created = booking::create(
        &db,
        &policy,
        new_booking(SUITS, &date, "14:00"),
        Requester::User(user_id),
    )
    .await
    .unwrap();

    assert!(is_booking_code(&created.booking_code), "bad code {}", created.booking_code);
    assert_eq!(created.status, BookingStatus::Pending);
    assert_eq!(created.total_amount, 3000);

    let found = booking::find_by_code(&db, &policy, &created.booking_code)
        .await
        .unwrap();

    assert_eq!(found.id, created.id);
    assert_eq!(found.owner_id, Some(user_id));
    assert_eq!(found.service_id, SUITS);
    assert_eq!(found.service_name, "Suits");
    assert_eq!(found.service_category, "dry_cleaning");
    assert_eq!(
        found.scheduled_date,
        NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap()
    );
    assert_eq!(found.scheduled_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
    assert_eq!(found.address, "KG 11 Ave, Kigali");
    assert_eq!(found.notes.as_deref(), Some("Gate code 1234"));
    assert_eq!(found.customer_name.as_deref(), Some("Test Customer"));
    assert_eq!(found.customer_phone.as_deref(), Some("+250788123456"));
}

#[tokio::test]
async fn test_lookup_is_case_insensitive() {
    let db = test_db().await;
    let policy = test_config().booking_policy();

    let created = booking::create(&db, &policy, new_booking(SHIRT, &future_date(1), "09:00"), guest(1))
        .await
        .unwrap();

    let found = booking::find_by_code(&db, &policy, &created.booking_code.to_lowercase())
        .await
        .unwrap();
    assert_eq!(found.id, created.id);

    assert!(matches!(
        booking::find_by_code(&db, &policy, "CL-NOPE0").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_guest_booking_keeps_contact_fields() {
    let db = test_db().await;
    let policy = test_config().booking_policy();

    let view = booking::create(&db, &policy, new_booking(SHIRT, &future_date(1), "10:00"), guest(7))
        .await
        .unwrap();

    assert_eq!(view.owner_id, None);
    assert_eq!(view.customer_name.as_deref(), Some("Guest 7"));
    assert_eq!(view.customer_phone.as_deref(), Some("+250788000007"));

    let blank = Requester::Guest {
        name: "  ".to_string(),
        contact: "+250788000001".to_string(),
    };
    assert!(matches!(
        booking::create(&db, &policy, new_booking(SHIRT, &future_date(1), "10:00"), blank).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_codes_are_unique_across_bookings() {
    let db = test_db().await;
    let policy = test_config().booking_policy();
    let mut codes = HashSet::new();

    for i in 0..12 {
        let time = format!("{:02}:00", 8 + i);
        let view = booking::create(&db, &policy, new_booking(SHIRT, &future_date(2), &time), guest(i))
            .await
            .unwrap();
        assert!(is_booking_code(&view.booking_code));
        assert!(codes.insert(view.booking_code));
    }
}

#[tokio::test]
async fn test_slot_capacity_is_enforced() {
    let db = test_db().await;
    let policy = test_config().booking_policy();
    let date = future_date(5);

    let mut first = None;
    for i in 0..3 {
        let view = booking::create(&db, &policy, new_booking(SUITS, &date, "14:00"), guest(i))
            .await
            .unwrap();
        first.get_or_insert(view.booking_code);
    }

    let full = booking::create(&db, &policy, new_booking(SUITS, &date, "14:00"), guest(3)).await;
    assert!(matches!(full, Err(AppError::Conflict(_))));

    // Any other time is still open
    booking::create(&db, &policy, new_booking(SUITS, &date, "15:00"), guest(3))
        .await
        .unwrap();

    // Cancelled bookings free their place
    booking::cancel(&db, &policy, &first.unwrap()).await.unwrap();
    booking::create(&db, &policy, new_booking(SUITS, &date, "14:00"), guest(4))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_capacity_follows_configuration() {
    let db = test_db().await;
    let mut config = test_config();
    config.slot_capacity = 1;
    let policy = config.booking_policy();
    let date = future_date(5);

    booking::create(&db, &policy, new_booking(SUITS, &date, "08:30"), guest(1))
        .await
        .unwrap();

    assert!(matches!(
        booking::create(&db, &policy, new_booking(SUITS, &date, "08:30"), guest(2)).await,
        Err(AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_express_pricing() {
    let db = test_db().await;
    let policy = test_config().booking_policy();

    let mut input = new_booking(SUITS, &future_date(1), "11:00");
    input.express = true;

    let view = booking::create(&db, &policy, input, guest(1)).await.unwrap();
    assert!(view.express);
    assert_eq!(view.total_amount, 7000);
}

#[tokio::test]
async fn test_rejects_bad_input() {
    let db = test_db().await;
    let policy = test_config().booking_policy();

    let mut input = new_booking(SUITS, "2025/06/16", "14:00");
    assert!(matches!(
        booking::create(&db, &policy, input.clone(), guest(1)).await,
        Err(AppError::Validation(_))
    ));

    input.scheduled_date = future_date(1);
    input.scheduled_time = "2pm".to_string();
    assert!(matches!(
        booking::create(&db, &policy, input.clone(), guest(1)).await,
        Err(AppError::Validation(_))
    ));

    input.scheduled_time = "14:00".to_string();
    input.address = "   ".to_string();
    assert!(matches!(
        booking::create(&db, &policy, input.clone(), guest(1)).await,
        Err(AppError::Validation(_))
    ));

    input.address = "KG 11 Ave".to_string();
    input.service_id = 999;
    assert!(matches!(
        booking::create(&db, &policy, input, guest(1)).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_inactive_service_cannot_be_booked() {
    let db = test_db().await;
    let policy = test_config().booking_policy();

    let shoes = service::Entity::find_by_id(10).one(&db).await.unwrap().unwrap();
    let mut active: service::ActiveModel = shoes.into();
    active.is_active = Set(false);
    active.update(&db).await.unwrap();

    let result = booking::create(&db, &policy, new_booking(10, &future_date(1), "12:00"), guest(1)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_update_pending_booking() {
    let db = test_db().await;
    let policy = test_config().booking_policy();
    let created = booking::create(&db, &policy, new_booking(SUITS, &future_date(2), "14:00"), guest(1))
        .await
        .unwrap();

    let patch = BookingPatch {
        service_id: Some(SHIRT),
        scheduled_time: Some("16:30".to_string()),
        address: Some("KN 5 Rd".to_string()),
        notes: Some("".to_string()),
        express: Some(true),
        ..Default::default()
    };

    booking::update_details(&db, &policy, &created.booking_code, patch)
        .await
        .unwrap();

    let found = booking::find_by_code(&db, &policy, &created.booking_code)
        .await
        .unwrap();
    assert_eq!(found.booking_code, created.booking_code);
    assert_eq!(found.service_name, "Shirt");
    assert_eq!(found.total_amount, 3000);
    assert_eq!(found.scheduled_time, NaiveTime::from_hms_opt(16, 30, 0).unwrap());
    assert_eq!(found.address, "KN 5 Rd");
    assert_eq!(found.notes, None);
    assert_eq!(found.status, BookingStatus::Pending);
}

#[tokio::test]
async fn test_update_rechecks_capacity_at_new_slot() {
    let db = test_db().await;
    let policy = test_config().booking_policy();
    let date = future_date(4);

    let mut at_ten = Vec::new();
    for i in 0..3 {
        let view = booking::create(&db, &policy, new_booking(SHIRT, &date, "10:00"), guest(i))
            .await
            .unwrap();
        at_ten.push(view.booking_code);
    }
    let other = booking::create(&db, &policy, new_booking(SHIRT, &date, "11:00"), guest(9))
        .await
        .unwrap();

    // Moving into the full slot fails
    let into_full = BookingPatch {
        scheduled_time: Some("10:00".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        booking::update_details(&db, &policy, &other.booking_code, into_full).await,
        Err(AppError::Conflict(_))
    ));

    // A booking already in the full slot can still be edited in place
    let in_place = BookingPatch {
        scheduled_time: Some("10:00".to_string()),
        notes: Some("Leave with the guard".to_string()),
        ..Default::default()
    };
    booking::update_details(&db, &policy, &at_ten[0], in_place)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_status_chain_and_frozen_terminal_states() {
    let db = test_db().await;
    let policy = test_config().booking_policy();
    let code = booking::create(&db, &policy, new_booking(SUITS, &future_date(1), "09:00"), guest(1))
        .await
        .unwrap()
        .booking_code;

    // Skipping ahead is not allowed
    assert!(matches!(
        booking::set_status(&db, &policy, &code, "completed").await,
        Err(AppError::InvalidState(_))
    ));

    for next in ["confirmed", "in-progress", "completed"] {
        booking::set_status(&db, &policy, &code, next).await.unwrap();
    }

    let done = booking::find_by_code(&db, &policy, &code).await.unwrap();
    assert_eq!(done.status, BookingStatus::Completed);

    let edit = BookingPatch {
        address: Some("Somewhere else".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        booking::update_details(&db, &policy, &code, edit).await,
        Err(AppError::InvalidState(_))
    ));
    assert!(matches!(
        booking::cancel(&db, &policy, &code).await,
        Err(AppError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_unknown_status_is_validation_error() {
    let db = test_db().await;
    let policy = test_config().booking_policy();
    let code = booking::create(&db, &policy, new_booking(SUITS, &future_date(1), "09:00"), guest(1))
        .await
        .unwrap()
        .booking_code;

    assert!(matches!(
        booking::set_status(&db, &policy, &code, "shipped").await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_cancel_keeps_the_record() {
    let db = test_db().await;
    let policy = test_config().booking_policy();
    let code = booking::create(&db, &policy, new_booking(SUITS, &future_date(1), "09:00"), guest(1))
        .await
        .unwrap()
        .booking_code;

    let cancelled = booking::cancel(&db, &policy, &code).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let found = booking::find_by_code(&db, &policy, &code).await.unwrap();
    assert_eq!(found.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_list_only_returns_own_bookings() {
    let db = test_db().await;
    let config = test_config();
    let policy = config.booking_policy();
    let alice = verified_user(&db, &config, "+250788111111").await;
    let bob = verified_user(&db, &config, "+250788222222").await;

    let mut alice_codes = HashSet::new();
    for time in ["09:00", "10:00"] {
        let view = booking::create(&db, &policy, new_booking(SHIRT, &future_date(1), time), Requester::User(alice))
            .await
            .unwrap();
        alice_codes.insert(view.booking_code);
    }
    booking::create(&db, &policy, new_booking(SHIRT, &future_date(1), "11:00"), Requester::User(bob))
        .await
        .unwrap();

    let listed = booking::list_for_requester(&db, &policy, alice).await.unwrap();
    let listed_codes: HashSet<String> = listed.into_iter().map(|v| v.booking_code).collect();
    assert_eq!(listed_codes, alice_codes);
}

#[tokio::test]
async fn test_admin_listing_stats_and_delete() {
    let db = test_db().await;
    let config = test_config();
    let policy = config.booking_policy();
    let timeout = config.query_timeout();
    let date = future_date(3);

    let mut codes = Vec::new();
    for (i, time) in ["09:00", "10:00", "11:00", "12:00"].iter().enumerate() {
        let view = booking::create(&db, &policy, new_booking(SHIRT, &date, time), guest(i))
            .await
            .unwrap();
        codes.push(view.booking_code);
    }

    booking::set_status(&db, &policy, &codes[0], "confirmed").await.unwrap();
    booking::cancel(&db, &policy, &codes[1]).await.unwrap();

    let stats = admin::stats(&db, timeout).await.unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.confirmed, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.in_progress, 0);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.today, 4);

    let pending = admin::list_bookings(&db, timeout, Some("pending")).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|v| v.status == BookingStatus::Pending));
    assert_eq!(admin::list_bookings(&db, timeout, None).await.unwrap().len(), 4);
    assert!(matches!(
        admin::list_bookings(&db, timeout, Some("lost")).await,
        Err(AppError::Validation(_))
    ));

    admin::delete_booking(&db, timeout, &codes[3]).await.unwrap();
    assert!(matches!(
        booking::find_by_code(&db, &policy, &codes[3]).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        admin::delete_booking(&db, timeout, &codes[3]).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_fill_slot_exactly() {
    let (db, path) = file_db(8).await;
    let policy = test_config().booking_policy();
    let date = future_date(6);

    let mut handles = Vec::new();
    for i in 0..8 {
        let db = db.clone();
        let policy = policy.clone();
        let date = date.clone();
        handles.push(tokio::spawn(async move {
            booking::create(&db, &policy, new_booking(SHIRT, &date, "13:00"), guest(i)).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let stored = booking_entity::Entity::find()
        .filter(booking_entity::Column::ScheduledDate.eq(NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap()))
        .count(&db)
        .await
        .unwrap();

    db.close().await.unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(created, 3);
    assert_eq!(stored, 3);
}

#[tokio::test]
async fn test_past_booking_can_be_edited_without_moving_date() {
    let db = test_db().await;
    let policy = test_config().booking_policy();
    let created = booking::create(&db, &policy, new_booking(SHIRT, &future_date(1), "09:00"), guest(1))
        .await
        .unwrap();

    // Age the booking into the past
    let yesterday = chrono::Utc::now().date_naive().pred_opt().unwrap();
    let model = booking_entity::Entity::find_by_id(created.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let mut active: booking_entity::ActiveModel = model.into();
    active.scheduled_date = Set(yesterday);
    active.update(&db).await.unwrap();

    let same_date = BookingPatch {
        scheduled_date: Some(yesterday.format("%Y-%m-%d").to_string()),
        notes: Some("Bring hangers".to_string()),
        ..Default::default()
    };
    let updated = booking::update_details(&db, &policy, &created.booking_code, same_date)
        .await
        .unwrap();
    assert_eq!(updated.scheduled_date, yesterday);
    assert_eq!(updated.notes.as_deref(), Some("Bring hangers"));

    let earlier = BookingPatch {
        scheduled_date: Some(yesterday.pred_opt().unwrap().format("%Y-%m-%d").to_string()),
        ..Default::default()
    };
    assert!(matches!(
        booking::update_details(&db, &policy, &created.booking_code, earlier).await,
        Err(AppError::Validation(_))
    ));
}
