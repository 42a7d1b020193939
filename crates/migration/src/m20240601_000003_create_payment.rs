//! Create `payment` table.
//!
//! Staging record for in-flight charges. Rows are never deleted; the
//! `metadata` column holds the type-tagged payload.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(uuid(Payment::Id).primary_key())
                    .col(string_len(Payment::PaymentId, 128).not_null())
                    .col(string_len(Payment::PaymentType, 32).not_null())
                    .col(big_integer(Payment::Amount).not_null())
                    .col(string_len(Payment::Currency, 8).not_null())
                    .col(string_len(Payment::Status, 16).not_null())
                    .col(json_binary(Payment::Metadata).not_null())
                    .col(ColumnDef::new(Payment::TransactionId).string_len(128).null())
                    .col(string_len(Payment::HostedUrl, 1024).not_null())
                    .col(ColumnDef::new(Payment::UserId).uuid().null())
                    .col(timestamp_with_time_zone(Payment::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Payment::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Payment::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Payment {
    Table,
    Id,
    PaymentId,
    PaymentType,
    Amount,
    Currency,
    Status,
    Metadata,
    TransactionId,
    HostedUrl,
    UserId,
    CreatedAt,
    UpdatedAt,
}
