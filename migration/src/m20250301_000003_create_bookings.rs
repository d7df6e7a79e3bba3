use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_services::Service;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(string_len(Booking::BookingCode, 20).not_null().unique_key())
                    .col(uuid_null(Booking::UserId))
                    .col(string_len_null(Booking::ContactName, 100))
                    .col(string_len_null(Booking::ContactPhone, 50))
                    .col(integer(Booking::ServiceId).not_null())
                    .col(date(Booking::ScheduledDate).not_null())
                    .col(time(Booking::ScheduledTime).not_null())
                    .col(text(Booking::Address).not_null())
                    .col(text_null(Booking::Notes))
                    .col(boolean(Booking::Express).not_null().default(false))
                    .col(
                        string_len(Booking::Status, 20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(big_integer(Booking::TotalAmount).not_null())
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_user")
                            .from(Booking::Table, Booking::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_service")
                            .from(Booking::Table, Booking::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Availability checks count bookings per slot
        manager
            .create_index(
                Index::create()
                    .name("idx_booking_slot")
                    .table(Booking::Table)
                    .col(Booking::ScheduledDate)
                    .col(Booking::ScheduledTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_user")
                    .table(Booking::Table)
                    .col(Booking::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    BookingCode,
    UserId,
    ContactName,
    ContactPhone,
    ServiceId,
    ScheduledDate,
    ScheduledTime,
    Address,
    Notes,
    Express,
    Status,
    TotalAmount,
    CreatedAt,
    UpdatedAt,
}
