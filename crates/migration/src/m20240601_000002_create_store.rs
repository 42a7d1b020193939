//! Create `store` table with FK to `user`.
//!
//! One storefront per reseller. Subdomain and custom domain uniqueness live
//! in the index migration so the constraint names are stable.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Store::Table)
                    .if_not_exists()
                    .col(uuid(Store::Id).primary_key())
                    .col(uuid(Store::ResellerId).not_null())
                    .col(string_len(Store::Name, 128).not_null())
                    .col(ColumnDef::new(Store::Description).text().null())
                    .col(ColumnDef::new(Store::Logo).string_len(512).null())
                    .col(string_len(Store::Subdomain, 63).not_null())
                    .col(ColumnDef::new(Store::CustomDomain).string_len(253).null())
                    .col(boolean(Store::CustomDomainVerified).not_null().default(false))
                    .col(string_len(Store::PrimaryColor, 16).not_null())
                    .col(string_len(Store::AccentColor, 16).not_null())
                    .col(string_len(Store::BackgroundColor, 16).not_null())
                    .col(integer(Store::DefaultMarkup).not_null().check(Expr::col(Store::DefaultMarkup).gte(0)))
                    .col(integer(Store::MinimumMarkup).not_null().check(Expr::col(Store::MinimumMarkup).gte(0)))
                    .col(integer(Store::MaximumMarkup).not_null().check(Expr::col(Store::MaximumMarkup).gte(0)))
                    .col(boolean(Store::AutoFulfillment).not_null().default(true))
                    .col(big_integer(Store::LowBalanceAlert).not_null().default(100))
                    .col(string_len(Store::Status, 32).not_null())
                    .col(big_integer(Store::TotalOrders).not_null().default(0))
                    .col(big_integer(Store::TotalRevenue).not_null().default(0))
                    .col(big_integer(Store::TotalProfit).not_null().default(0))
                    .col(timestamp_with_time_zone(Store::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Store::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_store_reseller")
                            .from(Store::Table, Store::ResellerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Store::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Store {
    Table,
    Id,
    ResellerId,
    Name,
    Description,
    Logo,
    Subdomain,
    CustomDomain,
    CustomDomainVerified,
    PrimaryColor,
    AccentColor,
    BackgroundColor,
    DefaultMarkup,
    MinimumMarkup,
    MaximumMarkup,
    AutoFulfillment,
    LowBalanceAlert,
    Status,
    TotalOrders,
    TotalRevenue,
    TotalProfit,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
