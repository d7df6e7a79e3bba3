use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::PhoneNumber, 20).not_null().unique_key())
                    .col(string_len_null(User::Email, 255))
                    .col(string_len(User::FullName, 100).not_null())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len_null(User::VerificationCode, 6))
                    .col(timestamp_with_time_zone_null(User::CodeExpires))
                    .col(boolean(User::IsVerified).not_null().default(false))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    PhoneNumber,
    Email,
    FullName,
    PasswordHash,
    VerificationCode,
    CodeExpires,
    IsVerified,
    CreatedAt,
}
