use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::ApiResponse;
use crate::services::auth::{self, RegisterRequest, Session};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyPhoneRequest {
    pub phone_number: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendCodeRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    /// Only present while no SMS gateway delivers codes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CodeIssued {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

/// Register a new customer account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RegisterResponse>>)> {
    let registration = auth::register(&state.db, &state.config.auth_policy(), payload).await?;

    let data = RegisterResponse {
        user_id: registration.user_id,
        verification_code: state
            .config
            .expose_verification_codes
            .then_some(registration.verification_code),
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Registration successful. Please verify your phone number.",
            data,
        )),
    ))
}

/// Confirm a phone number with the code sent at registration
pub async fn verify_phone(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPhoneRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    auth::verify(
        &state.db,
        &state.config.auth_policy(),
        &payload.phone_number,
        &payload.code,
    )
    .await?;

    Ok(Json(ApiResponse::success("Phone number verified", ())))
}

/// Login with phone number and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let session = auth::login(
        &state.db,
        &state.config.auth_policy(),
        &payload.phone_number,
        &payload.password,
    )
    .await?;

    Ok(Json(ApiResponse::success("Login successful", session)))
}

pub async fn resend_code(
    State(state): State<AppState>,
    Json(payload): Json<ResendCodeRequest>,
) -> AppResult<Json<ApiResponse<CodeIssued>>> {
    let code = auth::resend_code(&state.db, &state.config.auth_policy(), &payload.phone_number)
        .await?;

    let data = CodeIssued {
        verification_code: state.config.expose_verification_codes.then_some(code),
    };

    Ok(Json(ApiResponse::success("Verification code sent", data)))
}
