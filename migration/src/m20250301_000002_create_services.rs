use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Default catalog: (name, standard price, express price, category). Prices in RWF.
const DEFAULT_SERVICES: [(&str, i64, i64, &str); 10] = [
    ("Suits", 3000, 7000, "dry_cleaning"),
    ("Dress", 3000, 6000, "dry_cleaning"),
    ("Bride Dress", 8000, 16000, "dry_cleaning"),
    ("Coat", 2500, 5000, "dry_cleaning"),
    ("Umushanana", 3500, 7000, "dry_cleaning"),
    ("Shirt", 1500, 3000, "laundry"),
    ("Trouser", 1500, 3000, "laundry"),
    ("Bed Cover (big)", 10000, 20000, "laundry"),
    ("Curtains (big)", 15000, 30000, "laundry"),
    ("Shoes", 10000, 20000, "special"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Service::Table)
                    .if_not_exists()
                    .col(pk_auto(Service::Id))
                    .col(string_len(Service::Name, 100).not_null())
                    .col(string_len(Service::Category, 50).not_null())
                    .col(big_integer(Service::StandardPrice).not_null())
                    .col(big_integer_null(Service::ExpressPrice))
                    .col(boolean(Service::IsActive).not_null().default(true))
                    .to_owned(),
            )
            .await?;

        // Seed services
        let mut insert = Query::insert()
            .into_table(Service::Table)
            .columns([
                Service::Name,
                Service::StandardPrice,
                Service::ExpressPrice,
                Service::Category,
                Service::IsActive,
            ])
            .to_owned();

        for (name, standard, express, category) in DEFAULT_SERVICES {
            insert.values_panic([
                name.into(),
                standard.into(),
                express.into(),
                category.into(),
                true.into(),
            ]);
        }

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Service::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Service {
    Table,
    Id,
    Name,
    Category,
    StandardPrice,
    ExpressPrice,
    IsActive,
}
