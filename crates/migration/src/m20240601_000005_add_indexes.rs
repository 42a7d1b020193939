use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// Unique index names are matched by the models crate when classifying
// constraint violations; keep them in sync.
const UNIQ_USER_EMAIL: &str = "uniq_user_email";
const UNIQ_STORE_SUBDOMAIN: &str = "uniq_store_subdomain";
const UNIQ_STORE_CUSTOM_DOMAIN: &str = "uniq_store_custom_domain";
const UNIQ_STORE_RESELLER: &str = "uniq_store_reseller";
const UNIQ_PAYMENT_PAYMENT_ID: &str = "uniq_payment_payment_id";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Unique indexes: the final arbiters for email, subdomain and domain
        manager
            .create_index(
                Index::create()
                    .name(UNIQ_USER_EMAIL)
                    .table(User::Table)
                    .col(User::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name(UNIQ_STORE_SUBDOMAIN)
                    .table(Store::Table)
                    .col(Store::Subdomain)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name(UNIQ_STORE_CUSTOM_DOMAIN)
                    .table(Store::Table)
                    .col(Store::CustomDomain)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name(UNIQ_STORE_RESELLER)
                    .table(Store::Table)
                    .col(Store::ResellerId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name(UNIQ_PAYMENT_PAYMENT_ID)
                    .table(Payment::Table)
                    .col(Payment::PaymentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Payment: lookups by status for reconciliation
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_status")
                    .table(Payment::Table)
                    .col(Payment::Status)
                    .to_owned(),
            )
            .await?;

        // User: admin fan-out scans by role
        manager
            .create_index(
                Index::create()
                    .name("idx_user_role")
                    .table(User::Table)
                    .col(User::Role)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notification_user")
                    .table(Notification::Table)
                    .col(Notification::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name(UNIQ_USER_EMAIL).table(User::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name(UNIQ_STORE_SUBDOMAIN).table(Store::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name(UNIQ_STORE_CUSTOM_DOMAIN).table(Store::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name(UNIQ_STORE_RESELLER).table(Store::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name(UNIQ_PAYMENT_PAYMENT_ID).table(Payment::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_payment_status").table(Payment::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_user_role").table(User::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_notification_user").table(Notification::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum User { Table, Email, Role }

#[derive(DeriveIden)]
enum Store { Table, Subdomain, CustomDomain, ResellerId }

#[derive(DeriveIden)]
enum Payment { Table, PaymentId, Status }

#[derive(DeriveIden)]
enum Notification { Table, UserId }
