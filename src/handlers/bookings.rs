use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::ApiResponse;
use crate::middleware::auth::MaybeClaims;
use crate::services::booking::{self, BookingPatch, BookingView, NewBooking, Requester};
use crate::utils::jwt::{Claims, Role};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GuestBookingRequest {
    pub name: String,
    /// Phone number or email the shop can reach the guest on
    pub contact: String,
    #[serde(flatten)]
    pub booking: NewBooking,
}

/// Owner-held bookings are private to the owner (and admins). Guest
/// bookings are reachable by code alone.
fn ensure_access(view: &BookingView, claims: &MaybeClaims) -> AppResult<()> {
    let Some(owner) = view.owner_id else {
        return Ok(());
    };

    match &claims.0 {
        Some(c) if c.role == Role::Admin || c.sub == owner => Ok(()),
        Some(_) => Err(AppError::Forbidden(
            "You do not have access to this booking".to_string(),
        )),
        None => Err(AppError::Unauthorized(
            "Sign in to access this booking".to_string(),
        )),
    }
}

/// Book a service for the signed-in customer
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewBooking>,
) -> AppResult<(StatusCode, Json<ApiResponse<BookingView>>)> {
    let view = booking::create(
        &state.db,
        &state.config.booking_policy(),
        payload,
        Requester::User(claims.sub),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Booking created successfully", view)),
    ))
}

/// Book without an account; the returned code is the only handle
pub async fn create_guest_booking(
    State(state): State<AppState>,
    Json(payload): Json<GuestBookingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BookingView>>)> {
    let requester = Requester::Guest {
        name: payload.name,
        contact: payload.contact,
    };

    let view = booking::create(
        &state.db,
        &state.config.booking_policy(),
        payload.booking,
        requester,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Booking created successfully", view)),
    ))
}

/// Get current customer's bookings
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ApiResponse<Vec<BookingView>>>> {
    let views =
        booking::list_for_requester(&state.db, &state.config.booking_policy(), claims.sub).await?;

    Ok(Json(ApiResponse::success("Bookings retrieved", views)))
}

pub async fn get_booking(
    State(state): State<AppState>,
    claims: MaybeClaims,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<BookingView>>> {
    let view = booking::find_by_code(&state.db, &state.config.booking_policy(), &code).await?;
    ensure_access(&view, &claims)?;

    Ok(Json(ApiResponse::success("Booking found", view)))
}

pub async fn update_booking(
    State(state): State<AppState>,
    claims: MaybeClaims,
    Path(code): Path<String>,
    Json(patch): Json<BookingPatch>,
) -> AppResult<Json<ApiResponse<BookingView>>> {
    let policy = state.config.booking_policy();
    let current = booking::find_by_code(&state.db, &policy, &code).await?;
    ensure_access(&current, &claims)?;

    let view = booking::update_details(&state.db, &policy, &code, patch).await?;

    Ok(Json(ApiResponse::success("Booking updated successfully", view)))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    claims: MaybeClaims,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<BookingView>>> {
    let policy = state.config.booking_policy();
    let current = booking::find_by_code(&state.db, &policy, &code).await?;
    ensure_access(&current, &claims)?;

    let view = booking::cancel(&state.db, &policy, &code).await?;

    Ok(Json(ApiResponse::success("Booking cancelled successfully", view)))
}
