//! Migrator registering entity-specific migrations in dependency order.
//! Unique and lookup indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_user;
mod m20240601_000002_create_store;
mod m20240601_000003_create_payment;
mod m20240601_000004_create_notification;
mod m20240601_000005_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_user::Migration),
            Box::new(m20240601_000002_create_store::Migration),
            Box::new(m20240601_000003_create_payment::Migration),
            Box::new(m20240601_000004_create_notification::Migration),
            // Indexes should always be applied last
            Box::new(m20240601_000005_add_indexes::Migration),
        ]
    }
}
