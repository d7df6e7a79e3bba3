#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::{Days, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;

use laundry_booking::config::Config;
use laundry_booking::services::auth::{self, RegisterRequest};
use laundry_booking::AppState;

pub const PASSWORD: &str = "secret123";
pub const ADMIN_PASSWORD: &str = "admin-pass";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        db_timeout_secs: 5,
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_hours: 1,
        admin_password: ADMIN_PASSWORD.to_string(),
        admin_session_hours: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 3000,
        slot_capacity: 3,
        booking_code_prefix: "CL-".to_string(),
        verification_code_ttl_minutes: 30,
        expose_verification_codes: true,
    }
}

/// Fresh in-memory database with the full schema and seeded catalog.
///
/// One pooled connection: every connection to `sqlite::memory:` is its own
/// database.
pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// File-backed database with a real pool, for tests that need several
/// connections writing at once. The caller removes the file.
pub async fn file_db(max_connections: u32) -> (DatabaseConnection, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("laundry-booking-{}.db", uuid::Uuid::new_v4()));

    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options
        .max_connections(max_connections)
        .sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    (db, path)
}

pub async fn test_state() -> AppState {
    AppState {
        db: test_db().await,
        config: test_config(),
    }
}

/// YYYY-MM-DD `days` from today
pub fn future_date(days: u64) -> String {
    (Utc::now().date_naive() + Days::new(days))
        .format("%Y-%m-%d")
        .to_string()
}

/// Register and verify an account, returning its id.
pub async fn verified_user(
    db: &DatabaseConnection,
    config: &Config,
    phone: &str,
) -> uuid::Uuid {
    let policy = config.auth_policy();
    let registration = auth::register(
        db,
        &policy,
        RegisterRequest {
            phone_number: phone.to_string(),
            email: None,
            full_name: "Test Customer".to_string(),
            password: PASSWORD.to_string(),
        },
    )
    .await
    .unwrap();

    auth::verify(db, &policy, phone, &registration.verification_code)
        .await
        .unwrap();

    registration.user_id
}

pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
