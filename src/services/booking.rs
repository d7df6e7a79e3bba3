//! Booking lifecycle: creation with slot-capacity checks, lookup by code,
//! owner edits and status transitions.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BookingPolicy;
use crate::db::with_timeout;
use crate::entities::booking::{self, BookingStatus};
use crate::entities::{service, user};
use crate::error::{AppError, AppResult};
use crate::services::catalog::active_service;
use crate::utils::codes;

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub service_id: i32,
    /// YYYY-MM-DD
    pub scheduled_date: String,
    /// HH:MM or HH:MM:SS
    pub scheduled_time: String,
    pub address: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub express: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    pub service_id: Option<i32>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub express: Option<bool>,
}

/// Who a booking is made for.
#[derive(Debug, Clone)]
pub enum Requester {
    User(Uuid),
    Guest { name: String, contact: String },
}

/// Booking joined with its service and customer identity.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub id: Uuid,
    pub booking_code: String,
    pub owner_id: Option<Uuid>,
    pub service_id: i32,
    pub service_name: String,
    pub service_category: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub address: String,
    pub notes: Option<String>,
    pub express: bool,
    pub status: BookingStatus,
    pub total_amount: i64,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingView {
    fn assemble(
        b: booking::Model,
        service: Option<&service::Model>,
        owner: Option<&user::Model>,
    ) -> Self {
        let (customer_name, customer_phone) = match owner {
            Some(u) => (Some(u.full_name.clone()), Some(u.phone_number.clone())),
            None => (b.contact_name.clone(), b.contact_phone.clone()),
        };

        Self {
            id: b.id,
            booking_code: b.booking_code,
            owner_id: b.user_id,
            service_id: b.service_id,
            service_name: service.map(|s| s.name.clone()).unwrap_or_default(),
            service_category: service.map(|s| s.category.clone()).unwrap_or_default(),
            scheduled_date: b.scheduled_date,
            scheduled_time: b.scheduled_time,
            address: b.address,
            notes: b.notes,
            express: b.express,
            status: b.status,
            total_amount: b.total_amount,
            customer_name,
            customer_phone,
            created_at: b.created_at.with_timezone(&Utc),
            updated_at: b.updated_at.with_timezone(&Utc),
        }
    }
}

/// Create a pending booking for `requester`.
///
/// The slot count and the insert share one transaction so concurrent
/// requests cannot push a slot past capacity.
pub async fn create(
    db: &DatabaseConnection,
    policy: &BookingPolicy,
    input: NewBooking,
    requester: Requester,
) -> AppResult<BookingView> {
    let scheduled_date = parse_date(&input.scheduled_date)?;
    let scheduled_time = parse_time(&input.scheduled_time)?;
    ensure_not_past(scheduled_date)?;
    let address = required("Address", &input.address)?;
    let notes = normalize_notes(input.notes);

    let (user_id, contact_name, contact_phone) = match &requester {
        Requester::User(id) => (Some(*id), None, None),
        Requester::Guest { name, contact } => (
            None,
            Some(required("Name", name)?),
            Some(required("Contact", contact)?),
        ),
    };

    with_timeout("create_booking", policy.query_timeout, async {
        let txn = begin_slot_txn(db).await?;

        let owner = match user_id {
            Some(id) => Some(
                user::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?,
            ),
            None => None,
        };

        let service = active_service(&txn, input.service_id).await?;
        let total_amount = price_for(&service, input.express)?;

        ensure_slot_available(&txn, policy, scheduled_date, scheduled_time, None).await?;

        let booking_code =
            codes::unique_booking_code(&policy.code_prefix, |candidate| code_taken(&txn, candidate))
                .await;

        let now = Utc::now();
        let new_booking = booking::ActiveModel {
            id: Set(Uuid::new_v4()),
            booking_code: Set(booking_code),
            user_id: Set(user_id),
            contact_name: Set(contact_name),
            contact_phone: Set(contact_phone),
            service_id: Set(service.id),
            scheduled_date: Set(scheduled_date),
            scheduled_time: Set(scheduled_time),
            address: Set(address),
            notes: Set(notes),
            express: Set(input.express),
            status: Set(BookingStatus::Pending),
            total_amount: Set(total_amount),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let booking = new_booking.insert(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            booking_code = %booking.booking_code,
            service_id = booking.service_id,
            date = %booking.scheduled_date,
            time = %booking.scheduled_time,
            "booking created"
        );

        Ok(BookingView::assemble(booking, Some(&service), owner.as_ref()))
    })
    .await
}

pub async fn find_by_code(
    db: &DatabaseConnection,
    policy: &BookingPolicy,
    code: &str,
) -> AppResult<BookingView> {
    with_timeout("find_booking", policy.query_timeout, async {
        let booking = find_model(db, code).await?;
        view_of(db, booking).await
    })
    .await
}

/// All bookings owned by `user_id`, newest first. Unpaginated.
pub async fn list_for_requester(
    db: &DatabaseConnection,
    policy: &BookingPolicy,
    user_id: Uuid,
) -> AppResult<Vec<BookingView>> {
    with_timeout("list_bookings", policy.query_timeout, async {
        let bookings = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .order_by_desc(booking::Column::CreatedAt)
            .all(db)
            .await?;

        views_of(db, bookings).await
    })
    .await
}

/// Apply an owner's edit. Completed and cancelled bookings are frozen.
pub async fn update_details(
    db: &DatabaseConnection,
    policy: &BookingPolicy,
    code: &str,
    patch: BookingPatch,
) -> AppResult<BookingView> {
    with_timeout("update_booking", policy.query_timeout, async {
        let txn = begin_slot_txn(db).await?;
        let current = find_model(&txn, code).await?;

        if current.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Cannot modify a {} booking",
                current.status.as_str()
            )));
        }

        let mut active: booking::ActiveModel = current.clone().into();

        if patch.service_id.is_some() || patch.express.is_some() {
            let service_id = patch.service_id.unwrap_or(current.service_id);
            let express = patch.express.unwrap_or(current.express);
            let service = active_service(&txn, service_id).await?;

            active.service_id = Set(service.id);
            active.express = Set(express);
            active.total_amount = Set(price_for(&service, express)?);
        }

        let date = match patch.scheduled_date.as_deref() {
            Some(raw) => parse_date(raw)?,
            None => current.scheduled_date,
        };
        if date != current.scheduled_date {
            ensure_not_past(date)?;
        }
        let time = match patch.scheduled_time.as_deref() {
            Some(raw) => parse_time(raw)?,
            None => current.scheduled_time,
        };

        if (date, time) != (current.scheduled_date, current.scheduled_time) {
            ensure_slot_available(&txn, policy, date, time, Some(current.id)).await?;
            active.scheduled_date = Set(date);
            active.scheduled_time = Set(time);
        }

        if let Some(address) = patch.address.as_deref() {
            active.address = Set(required("Address", address)?);
        }

        if patch.notes.is_some() {
            active.notes = Set(normalize_notes(patch.notes));
        }

        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;
        let view = view_of(&txn, updated).await?;
        txn.commit().await?;

        tracing::info!(booking_code = %view.booking_code, "booking updated");
        Ok(view)
    })
    .await
}

/// Move a booking to `status`, which must name one of the five statuses
/// and be a legal edge from the current one.
pub async fn set_status(
    db: &DatabaseConnection,
    policy: &BookingPolicy,
    code: &str,
    status: &str,
) -> AppResult<BookingView> {
    let next = BookingStatus::parse(status)
        .ok_or_else(|| AppError::Validation(format!("Invalid status: {}", status)))?;

    with_timeout("set_booking_status", policy.query_timeout, transition(db, code, next)).await
}

/// Cancelling flips the status; the row is kept.
pub async fn cancel(
    db: &DatabaseConnection,
    policy: &BookingPolicy,
    code: &str,
) -> AppResult<BookingView> {
    with_timeout(
        "cancel_booking",
        policy.query_timeout,
        transition(db, code, BookingStatus::Cancelled),
    )
    .await
}

async fn transition(
    db: &DatabaseConnection,
    code: &str,
    next: BookingStatus,
) -> AppResult<BookingView> {
    let current = find_model(db, code).await?;

    if !current.status.can_transition_to(next) {
        return Err(AppError::InvalidState(format!(
            "Cannot change booking status from {} to {}",
            current.status.as_str(),
            next.as_str()
        )));
    }

    // Only applies if nobody moved the booking since we read it
    let result = booking::Entity::update_many()
        .col_expr(booking::Column::Status, Expr::value(next))
        .col_expr(
            booking::Column::UpdatedAt,
            Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
        )
        .filter(booking::Column::Id.eq(current.id))
        .filter(booking::Column::Status.eq(current.status))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Booking was modified by another request, please retry".to_string(),
        ));
    }

    tracing::info!(
        booking_code = %current.booking_code,
        from = current.status.as_str(),
        to = next.as_str(),
        "booking status changed"
    );

    let updated = find_model(db, code).await?;
    view_of(db, updated).await
}

// ── Helpers ──

/// Serializable on Postgres/MySQL.
///
/// SQLite has no isolation levels and its transactions start deferred: two
/// readers that both try to upgrade to a writer fail with SQLITE_BUSY
/// instead of waiting. A no-op write takes the write lock before the slot
/// count, so concurrent slot transactions queue on the busy timeout.
async fn begin_slot_txn(db: &DatabaseConnection) -> AppResult<DatabaseTransaction> {
    match db.get_database_backend() {
        DbBackend::Sqlite => {
            let txn = db.begin().await?;
            txn.execute_unprepared("UPDATE booking SET status = status WHERE 1 = 0")
                .await?;
            Ok(txn)
        }
        _ => Ok(db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?),
    }
}

pub(crate) async fn find_model<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> AppResult<booking::Model> {
    booking::Entity::find()
        .filter(booking::Column::BookingCode.eq(code.trim().to_uppercase()))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

async fn code_taken<C: ConnectionTrait>(conn: &C, code: String) -> AppResult<bool> {
    let existing = booking::Entity::find()
        .filter(booking::Column::BookingCode.eq(code))
        .count(conn)
        .await?;

    Ok(existing > 0)
}

/// Active bookings at the exact (date, time) pair.
pub(crate) async fn active_count_at_slot<C: ConnectionTrait>(
    conn: &C,
    date: NaiveDate,
    time: NaiveTime,
    exclude: Option<Uuid>,
) -> AppResult<u64> {
    let mut query = booking::Entity::find()
        .filter(booking::Column::ScheduledDate.eq(date))
        .filter(booking::Column::ScheduledTime.eq(time))
        .filter(booking::Column::Status.is_in(BookingStatus::ACTIVE));

    if let Some(id) = exclude {
        query = query.filter(booking::Column::Id.ne(id));
    }

    Ok(query.count(conn).await?)
}

async fn ensure_slot_available<C: ConnectionTrait>(
    conn: &C,
    policy: &BookingPolicy,
    date: NaiveDate,
    time: NaiveTime,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let taken = active_count_at_slot(conn, date, time, exclude).await?;

    if taken >= policy.slot_capacity {
        tracing::debug!(%date, %time, taken, "slot full");
        return Err(AppError::Conflict(
            "This time slot is fully booked. Please choose another time.".to_string(),
        ));
    }

    Ok(())
}

async fn view_of<C: ConnectionTrait>(conn: &C, booking: booking::Model) -> AppResult<BookingView> {
    views_of(conn, vec![booking])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Booking view missing".to_string()))
}

/// Join bookings with their services and owners in two batched lookups.
pub(crate) async fn views_of<C: ConnectionTrait>(
    conn: &C,
    bookings: Vec<booking::Model>,
) -> AppResult<Vec<BookingView>> {
    if bookings.is_empty() {
        return Ok(Vec::new());
    }

    let service_ids: Vec<i32> = bookings.iter().map(|b| b.service_id).collect();
    let user_ids: Vec<Uuid> = bookings.iter().filter_map(|b| b.user_id).collect();

    let services: HashMap<i32, service::Model> = service::Entity::find()
        .filter(service::Column::Id.is_in(service_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let users: HashMap<Uuid, user::Model> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };

    Ok(bookings
        .into_iter()
        .map(|b| {
            let service = services.get(&b.service_id);
            let owner = b.user_id.and_then(|id| users.get(&id));
            BookingView::assemble(b, service, owner)
        })
        .collect())
}

fn price_for(service: &service::Model, express: bool) -> AppResult<i64> {
    service.price(express).ok_or_else(|| {
        AppError::Validation(format!("Express service is not available for {}", service.name))
    })
}

pub(crate) fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
    })
}

pub(crate) fn parse_time(raw: &str) -> AppResult<NaiveTime> {
    let raw_trimmed = raw.trim();
    NaiveTime::parse_from_str(raw_trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw_trimmed, "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("Invalid time '{}', expected HH:MM", raw)))
}

fn ensure_not_past(date: NaiveDate) -> AppResult<()> {
    if date < Utc::now().date_naive() {
        return Err(AppError::Validation(
            "Cannot schedule a booking in the past".to_string(),
        ));
    }
    Ok(())
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}
