use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Names of the unique indexes created by the migration crate.
pub const UNIQ_USER_EMAIL: &str = "uniq_user_email";
pub const UNIQ_STORE_SUBDOMAIN: &str = "uniq_store_subdomain";
pub const UNIQ_STORE_CUSTOM_DOMAIN: &str = "uniq_store_custom_domain";
pub const UNIQ_STORE_RESELLER: &str = "uniq_store_reseller";
pub const UNIQ_PAYMENT_PAYMENT_ID: &str = "uniq_payment_payment_id";

const UNIQUE_INDEXES: [&str; 5] = [
    UNIQ_USER_EMAIL,
    UNIQ_STORE_SUBDOMAIN,
    UNIQ_STORE_CUSTOM_DOMAIN,
    UNIQ_STORE_RESELLER,
    UNIQ_PAYMENT_PAYMENT_ID,
];

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Db(String),
}

impl ModelError {
    /// Classify a driver error, naming the unique index when one was hit.
    pub fn from_db(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => Self::UniqueViolation(constraint_name(&msg)),
            _ => Self::Db(err.to_string()),
        }
    }

    pub fn is_unique_violation_of(&self, index: &str) -> bool {
        matches!(self, Self::UniqueViolation(name) if name == index)
    }
}

fn constraint_name(msg: &str) -> String {
    UNIQUE_INDEXES
        .iter()
        .find(|name| msg.contains(*name))
        .map(|name| name.to_string())
        .unwrap_or_else(|| msg.to_string())
}
