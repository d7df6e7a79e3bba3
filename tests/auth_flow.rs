mod common;

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use laundry_booking::entities::user;
use laundry_booking::services::auth::{self, RegisterRequest};
use laundry_booking::utils::jwt::{verify_token, Role};
use laundry_booking::AppError;

use common::{test_config, test_db, verified_user, PASSWORD};

fn registration(phone: &str) -> RegisterRequest {
    RegisterRequest {
        phone_number: phone.to_string(),
        email: Some("Jane@Example.com".to_string()),
        full_name: "Jane Uwase".to_string(),
        password: PASSWORD.to_string(),
    }
}

#[tokio::test]
async fn test_verification_code_is_single_use() {
    let db = test_db().await;
    let policy = test_config().auth_policy();
    let phone = "+250788123456";

    let registered = auth::register(&db, &policy, registration(phone)).await.unwrap();
    assert_eq!(registered.verification_code.len(), 6);

    auth::verify(&db, &policy, phone, &registered.verification_code)
        .await
        .unwrap();

    let stored = user::Entity::find_by_id(registered.user_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_verified);
    assert_eq!(stored.verification_code, None);
    assert_eq!(stored.code_expires, None);
    assert_eq!(stored.email.as_deref(), Some("jane@example.com"));

    assert!(matches!(
        auth::verify(&db, &policy, phone, &registered.verification_code).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_wrong_code_is_rejected() {
    let db = test_db().await;
    let policy = test_config().auth_policy();
    let phone = "+250788123456";

    let registered = auth::register(&db, &policy, registration(phone)).await.unwrap();
    let wrong = if registered.verification_code == "123456" { "654321" } else { "123456" };

    assert!(matches!(
        auth::verify(&db, &policy, phone, wrong).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        auth::verify(&db, &policy, "+250788999999", &registered.verification_code).await,
        Err(AppError::Validation(_))
    ));

    // The right code still works afterwards
    auth::verify(&db, &policy, phone, &registered.verification_code)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let db = test_db().await;
    let policy = test_config().auth_policy();
    let phone = "+250788123456";

    let registered = auth::register(&db, &policy, registration(phone)).await.unwrap();

    let stored = user::Entity::find_by_id(registered.user_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let mut active: user::ActiveModel = stored.into();
    active.code_expires = Set(Some((Utc::now() - Duration::minutes(1)).into()));
    active.update(&db).await.unwrap();

    assert!(matches!(
        auth::verify(&db, &policy, phone, &registered.verification_code).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let db = test_db().await;
    let policy = test_config().auth_policy();

    let mut short = registration("+250788123456");
    short.password = "12345".to_string();
    assert!(matches!(
        auth::register(&db, &policy, short).await,
        Err(AppError::Validation(_))
    ));

    let mut nameless = registration("+250788123456");
    nameless.full_name = " ".to_string();
    assert!(matches!(
        auth::register(&db, &policy, nameless).await,
        Err(AppError::Validation(_))
    ));

    assert!(matches!(
        auth::register(&db, &policy, registration("not a phone")).await,
        Err(AppError::Validation(_))
    ));

    auth::register(&db, &policy, registration("+250788123456"))
        .await
        .unwrap();

    // Same number with different spacing is the same account
    assert!(matches!(
        auth::register(&db, &policy, registration("+250 788 123 456")).await,
        Err(AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_login_requires_verified_phone() {
    let db = test_db().await;
    let policy = test_config().auth_policy();
    let phone = "+250788123456";

    auth::register(&db, &policy, registration(phone)).await.unwrap();

    assert!(matches!(
        auth::login(&db, &policy, phone, PASSWORD).await,
        Err(AppError::Unverified)
    ));
    // Wrong password never reveals verification state
    assert!(matches!(
        auth::login(&db, &policy, phone, "not-the-password").await,
        Err(AppError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_login_issues_customer_token() {
    let db = test_db().await;
    let config = test_config();
    let policy = config.auth_policy();
    let phone = "+250788123456";
    let user_id = verified_user(&db, &config, phone).await;

    let session = auth::login(&db, &policy, phone, PASSWORD).await.unwrap();
    assert_eq!(session.user.id, user_id);
    assert_eq!(session.user.phone_number, phone);

    let claims = verify_token(&session.token, &config.jwt_secret).unwrap();
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.role, Role::Customer);

    assert!(matches!(
        auth::login(&db, &policy, phone, "wrong-password").await,
        Err(AppError::InvalidCredentials)
    ));
    assert!(matches!(
        auth::login(&db, &policy, "+250788000000", PASSWORD).await,
        Err(AppError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_resend_code_replaces_previous_code() {
    let db = test_db().await;
    let policy = test_config().auth_policy();
    let phone = "+250788123456";

    let registered = auth::register(&db, &policy, registration(phone)).await.unwrap();
    let fresh = auth::resend_code(&db, &policy, phone).await.unwrap();

    let stored = user::Entity::find()
        .filter(user::Column::PhoneNumber.eq(phone))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.verification_code.as_deref(), Some(fresh.as_str()));

    if fresh != registered.verification_code {
        assert!(matches!(
            auth::verify(&db, &policy, phone, &registered.verification_code).await,
            Err(AppError::Validation(_))
        ));
    }

    auth::verify(&db, &policy, phone, &fresh).await.unwrap();

    assert!(matches!(
        auth::resend_code(&db, &policy, phone).await,
        Err(AppError::InvalidState(_))
    ));
    assert!(matches!(
        auth::resend_code(&db, &policy, "+250788000000").await,
        Err(AppError::NotFound(_))
    ));
}
