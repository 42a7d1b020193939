//! Create `user` table.
//!
//! Resellers and admins. Email uniqueness is enforced by `uniq_user_email`
//! (added with the other indexes); emails are stored lowercased.
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
                    .col(string_len(User::Email, 255).not_null())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len(User::Name, 128).not_null())
                    .col(ColumnDef::new(User::BusinessName).string_len(128).null())
                    .col(string_len(User::Role, 32).not_null())
                    .col(string_len(User::Status, 32).not_null())
                    .col(
                        big_integer(User::WalletBalance)
                            .not_null()
                            .default(0)
                            .check(Expr::col(User::WalletBalance).gte(0)),
                    )
                    .col(string_len(User::WalletCurrency, 8).not_null())
                    .col(big_integer(User::TotalOrders).not_null().default(0))
                    .col(big_integer(User::TotalRevenue).not_null().default(0))
                    .col(big_integer(User::TotalProfit).not_null().default(0))
                    .col(timestamp_with_time_zone(User::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(User::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Email,
    PasswordHash,
    Name,
    BusinessName,
    Role,
    Status,
    WalletBalance,
    WalletCurrency,
    TotalOrders,
    TotalRevenue,
    TotalProfit,
    CreatedAt,
    UpdatedAt,
}
