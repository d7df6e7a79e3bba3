use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthPolicy;
use crate::db::with_timeout;
use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::utils::codes::{generate_code, CodeKind};
use crate::utils::jwt::{create_token, Role};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub phone_number: String,
    pub email: Option<String>,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug)]
pub struct Registration {
    pub user_id: Uuid,
    pub verification_code: String,
}

#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub phone_number: String,
    pub email: Option<String>,
    pub full_name: String,
}

impl From<user::Model> for UserInfo {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            phone_number: u.phone_number,
            email: u.email,
            full_name: u.full_name,
        }
    }
}

/// Create an unverified account and issue its first verification code.
pub async fn register(
    db: &DatabaseConnection,
    policy: &AuthPolicy,
    input: RegisterRequest,
) -> AppResult<Registration> {
    let phone_number = normalize_phone(&input.phone_number)?;
    let full_name = input.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(AppError::Validation("Full name is required".to_string()));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let email = input
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    let password_hash = hash_password(&input.password)?;

    with_timeout("register_user", policy.query_timeout, async {
        let existing = user::Entity::find()
            .filter(user::Column::PhoneNumber.eq(&phone_number))
            .one(db)
            .await?;

        if existing.is_some() {
            return Err(AppError::Conflict(
                "User with this phone number already exists".to_string(),
            ));
        }

        let verification_code = generate_code(CodeKind::Verification);
        let now = Utc::now();

        let new_user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            phone_number: Set(phone_number.clone()),
            email: Set(email),
            full_name: Set(full_name),
            password_hash: Set(password_hash),
            verification_code: Set(Some(verification_code.clone())),
            code_expires: Set(Some((now + policy.code_ttl).into())),
            is_verified: Set(false),
            created_at: Set(now.into()),
        };

        let user = new_user.insert(db).await?;
        tracing::info!(user_id = %user.id, "user registered, awaiting verification");

        Ok(Registration {
            user_id: user.id,
            verification_code,
        })
    })
    .await
}

/// Mark the phone number verified if `code` matches and has not expired.
///
/// The code is cleared in the same conditional update that sets the flag,
/// so two racing requests cannot both succeed.
pub async fn verify(
    db: &DatabaseConnection,
    policy: &AuthPolicy,
    phone_number: &str,
    code: &str,
) -> AppResult<()> {
    let phone_number = normalize_phone(phone_number)?;
    let code = code.trim();
    let rejected = || AppError::Validation("Invalid or expired verification code".to_string());

    with_timeout("verify_phone", policy.query_timeout, async {
        let user = user::Entity::find()
            .filter(user::Column::PhoneNumber.eq(&phone_number))
            .one(db)
            .await?
            .ok_or_else(rejected)?;

        let now = Utc::now();
        let unexpired = user
            .code_expires
            .is_some_and(|expires| expires.with_timezone(&Utc) > now);

        if code.is_empty() || user.verification_code.as_deref() != Some(code) || !unexpired {
            tracing::debug!(user_id = %user.id, "verification rejected");
            return Err(rejected());
        }

        let result = user::Entity::update_many()
            .col_expr(user::Column::IsVerified, Expr::value(true))
            .col_expr(user::Column::VerificationCode, Expr::value(Option::<String>::None))
            .col_expr(
                user::Column::CodeExpires,
                Expr::value(Option::<DateTimeWithTimeZone>::None),
            )
            .filter(user::Column::Id.eq(user.id))
            .filter(user::Column::VerificationCode.eq(code))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(rejected());
        }

        tracing::info!(user_id = %user.id, "phone number verified");
        Ok(())
    })
    .await
}

/// Password is checked before verification status, so an unverified
/// account only learns it is unverified with the right password.
pub async fn login(
    db: &DatabaseConnection,
    policy: &AuthPolicy,
    phone_number: &str,
    password: &str,
) -> AppResult<Session> {
    let phone_number = normalize_phone(phone_number).map_err(|_| AppError::InvalidCredentials)?;

    let user = with_timeout("login", policy.query_timeout, async {
        Ok(user::Entity::find()
            .filter(user::Column::PhoneNumber.eq(&phone_number))
            .one(db)
            .await?)
    })
    .await?;

    // Unknown numbers pay for a hash check too, so timing does not reveal
    // which numbers are registered
    let Some(user) = user else {
        let _ = verify_password(password, dummy_hash()?);
        return Err(AppError::InvalidCredentials);
    };

    verify_password(password, &user.password_hash)?;

    if !user.is_verified {
        return Err(AppError::Unverified);
    }

    let token = create_token(
        user.id,
        &user.phone_number,
        Role::Customer,
        &policy.jwt_secret,
        policy.jwt_expiration_hours,
    )?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Session {
        token,
        user: user.into(),
    })
}

/// Replace the pending verification code with a fresh one.
pub async fn resend_code(
    db: &DatabaseConnection,
    policy: &AuthPolicy,
    phone_number: &str,
) -> AppResult<String> {
    let phone_number = normalize_phone(phone_number)?;

    with_timeout("resend_code", policy.query_timeout, async {
        let user = user::Entity::find()
            .filter(user::Column::PhoneNumber.eq(&phone_number))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.is_verified {
            return Err(AppError::InvalidState(
                "Phone number is already verified".to_string(),
            ));
        }

        let code = generate_code(CodeKind::Verification);
        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.verification_code = Set(Some(code.clone()));
        active.code_expires = Set(Some((Utc::now() + policy.code_ttl).into()));
        active.update(db).await?;

        tracing::info!(user_id = %user_id, "verification code reissued");
        Ok(code)
    })
    .await
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

fn dummy_hash() -> AppResult<&'static str> {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();

    if let Some(hash) = DUMMY_HASH.get() {
        return Ok(hash);
    }
    let hash = hash_password("unregistered-account")?;
    Ok(DUMMY_HASH.get_or_init(|| hash))
}

fn verify_password(password: &str, stored_hash: &str) -> AppResult<()> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::InvalidCredentials)
}

/// Strip spaces and dashes; accept an optional leading `+` and 7 to 15 digits.
pub(crate) fn normalize_phone(raw: &str) -> AppResult<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    let valid = (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());

    if !valid {
        return Err(AppError::Validation("Invalid phone number".to_string()));
    }

    Ok(cleaned)
}
