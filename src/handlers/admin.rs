use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::entities::service;
use crate::error::AppResult;
use crate::handlers::ApiResponse;
use crate::services::admin::{self, AdminSession, BookingStats};
use crate::services::booking::{self, BookingView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct BookingFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Exchange the dashboard password for an admin session token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> AppResult<Json<ApiResponse<AdminSession>>> {
    let session = admin::admin_login(&state.config, &payload.password)?;
    Ok(Json(ApiResponse::success("Admin login successful", session)))
}

/// List all bookings (admin)
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(filter): Query<BookingFilter>,
) -> AppResult<Json<ApiResponse<Vec<BookingView>>>> {
    let views = admin::list_bookings(
        &state.db,
        state.config.query_timeout(),
        filter.status.as_deref(),
    )
    .await?;

    Ok(Json(ApiResponse::success("Bookings retrieved", views)))
}

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<ApiResponse<BookingStats>>> {
    let stats = admin::stats(&state.db, state.config.query_timeout()).await?;
    Ok(Json(ApiResponse::success("Stats retrieved", stats)))
}

/// Full catalog including inactive services
pub async fn list_services(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<service::Model>>>> {
    let services = admin::list_all_services(&state.db, state.config.query_timeout()).await?;
    Ok(Json(ApiResponse::success("Services retrieved", services)))
}

/// Move a booking along its lifecycle
pub async fn update_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<BookingView>>> {
    let view = booking::set_status(
        &state.db,
        &state.config.booking_policy(),
        &code,
        &payload.status,
    )
    .await?;

    Ok(Json(ApiResponse::success("Booking status updated", view)))
}

/// Delete a booking (admin)
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    admin::delete_booking(&state.db, state.config.query_timeout(), &code).await?;
    Ok(Json(ApiResponse::success("Booking deleted", ())))
}
