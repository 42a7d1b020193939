use thiserror::Error;

use models::errors::{
    ModelError, UNIQ_PAYMENT_PAYMENT_ID, UNIQ_STORE_CUSTOM_DOMAIN, UNIQ_STORE_RESELLER, UNIQ_STORE_SUBDOMAIN,
    UNIQ_USER_EMAIL,
};

use crate::errors::ServiceError;
use crate::password::HashError;
use crate::payment::{GatewayError, PaymentStatus, PaymentType};
use crate::subdomain::AllocationError;

/// Which unique index rejected a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    Email,
    Subdomain,
    CustomDomain,
    StoreOwner,
    PaymentId,
    Other(String),
}

impl ConflictKind {
    pub fn from_index(name: &str) -> Self {
        match name {
            UNIQ_USER_EMAIL => Self::Email,
            UNIQ_STORE_SUBDOMAIN => Self::Subdomain,
            UNIQ_STORE_CUSTOM_DOMAIN => Self::CustomDomain,
            UNIQ_STORE_RESELLER => Self::StoreOwner,
            UNIQ_PAYMENT_PAYMENT_ID => Self::PaymentId,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Business errors of the registration and payment-outcome workflows
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("payment not found: {0}")]
    NotFound(String),
    #[error("payment {payment_id} is {}", .status.as_str())]
    InvalidState { payment_id: String, status: PaymentStatus },
    #[error("payment {payment_id} is not a reseller registration ({found:?})")]
    InvalidPaymentType { payment_id: String, found: PaymentType },
    #[error("no free subdomain for '{base}' after {attempts} attempts")]
    AllocationExhausted { base: String, attempts: u32 },
    #[error("conflicting write: {0:?}")]
    PersistenceConflict(ConflictKind),
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("hashing error: {0}")]
    Hashing(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl RegistrationError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            RegistrationError::Validation(_) => 2001,
            RegistrationError::DuplicateEmail => 2002,
            RegistrationError::NotFound(_) => 2003,
            RegistrationError::InvalidState { .. } => 2004,
            RegistrationError::InvalidPaymentType { .. } => 2005,
            RegistrationError::PersistenceConflict(_) => 2006,
            RegistrationError::AllocationExhausted { .. } => 2101,
            RegistrationError::Gateway(_) => 2102,
            RegistrationError::Hashing(_) => 2103,
            RegistrationError::Repository(_) => 2200,
        }
    }

    /// Whether the message may be shown to the caller verbatim.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RegistrationError::Validation(_)
                | RegistrationError::DuplicateEmail
                | RegistrationError::NotFound(_)
                | RegistrationError::InvalidState { .. }
                | RegistrationError::InvalidPaymentType { .. }
                | RegistrationError::PersistenceConflict(_)
        )
    }
}

impl From<ServiceError> for RegistrationError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => Self::Validation(msg),
            ServiceError::NotFound(msg) => Self::NotFound(msg),
            ServiceError::Model(ModelError::Validation(msg)) => Self::Validation(msg),
            ServiceError::Model(ModelError::UniqueViolation(index)) => {
                Self::PersistenceConflict(ConflictKind::from_index(&index))
            }
            other => Self::Repository(other.to_string()),
        }
    }
}

impl From<AllocationError> for RegistrationError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::Exhausted { base, attempts } => Self::AllocationExhausted { base, attempts },
            AllocationError::Probe(inner) => inner.into(),
        }
    }
}

impl From<HashError> for RegistrationError {
    fn from(e: HashError) -> Self { Self::Hashing(e.0) }
}
