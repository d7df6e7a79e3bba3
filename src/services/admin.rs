use std::time::Duration;

use chrono::{NaiveTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::Config;
use crate::db::with_timeout;
use crate::entities::booking::{self, BookingStatus};
use crate::entities::service;
use crate::error::{AppError, AppResult};
use crate::services::booking::{views_of, BookingView};
use crate::utils::jwt::{create_token, Role};

#[derive(Debug, Serialize)]
pub struct AdminSession {
    pub token: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct BookingStats {
    pub total: u64,
    pub pending: u64,
    pub confirmed: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
    /// Created since midnight UTC
    pub today: u64,
    /// Catalog size, retired services included
    pub total_services: u64,
}

/// Exchange the shared admin password for a short-lived admin token.
pub fn admin_login(config: &Config, password: &str) -> AppResult<AdminSession> {
    let matches: bool = password
        .as_bytes()
        .ct_eq(config.admin_password.as_bytes())
        .into();

    if config.admin_password.is_empty() || !matches {
        tracing::warn!("admin login rejected");
        return Err(AppError::Unauthorized("Invalid admin password".to_string()));
    }

    let token = create_token(
        Uuid::nil(),
        "admin",
        Role::Admin,
        &config.jwt_secret,
        config.admin_session_hours,
    )?;

    Ok(AdminSession {
        token,
        expires_in_hours: config.admin_session_hours,
    })
}

/// Every booking, newest first, optionally narrowed to one status.
pub async fn list_bookings(
    db: &DatabaseConnection,
    timeout: Duration,
    status: Option<&str>,
) -> AppResult<Vec<BookingView>> {
    let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            BookingStatus::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Invalid status: {}", raw)))?,
        ),
        None => None,
    };

    with_timeout("admin_list_bookings", timeout, async {
        let mut query = booking::Entity::find();
        if let Some(status) = status {
            query = query.filter(booking::Column::Status.eq(status));
        }

        let bookings = query
            .order_by_desc(booking::Column::CreatedAt)
            .all(db)
            .await?;

        views_of(db, bookings).await
    })
    .await
}

pub async fn stats(db: &DatabaseConnection, timeout: Duration) -> AppResult<BookingStats> {
    with_timeout("admin_stats", timeout, async {
        let count_status = |status: BookingStatus| {
            booking::Entity::find()
                .filter(booking::Column::Status.eq(status))
                .count(db)
        };

        let midnight: DateTimeWithTimeZone = Utc::now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .into();

        Ok(BookingStats {
            total: booking::Entity::find().count(db).await?,
            pending: count_status(BookingStatus::Pending).await?,
            confirmed: count_status(BookingStatus::Confirmed).await?,
            in_progress: count_status(BookingStatus::InProgress).await?,
            completed: count_status(BookingStatus::Completed).await?,
            cancelled: count_status(BookingStatus::Cancelled).await?,
            today: booking::Entity::find()
                .filter(booking::Column::CreatedAt.gte(midnight))
                .count(db)
                .await?,
            total_services: service::Entity::find().count(db).await?,
        })
    })
    .await
}

/// The whole catalog for the dashboard, retired services included.
pub async fn list_all_services(
    db: &DatabaseConnection,
    timeout: Duration,
) -> AppResult<Vec<service::Model>> {
    with_timeout("admin_list_services", timeout, async {
        Ok(service::Entity::find()
            .order_by_asc(service::Column::Category)
            .order_by_asc(service::Column::Name)
            .all(db)
            .await?)
    })
    .await
}

/// Hard delete. Customers cancel instead; only the dashboard removes rows.
pub async fn delete_booking(
    db: &DatabaseConnection,
    timeout: Duration,
    code: &str,
) -> AppResult<()> {
    let code = code.trim().to_uppercase();

    with_timeout("admin_delete_booking", timeout, async {
        let result = booking::Entity::delete_many()
            .filter(booking::Column::BookingCode.eq(&code))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Booking not found".to_string()));
        }

        tracing::info!(booking_code = %code, "booking deleted by admin");
        Ok(())
    })
    .await
}
