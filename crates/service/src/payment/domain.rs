use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use models::payment::{PaymentStatus, PaymentType};

use crate::errors::ServiceError;

/// Registration password as staged inside a pending payment.
///
/// With eager hashing only the argon2 PHC string is ever staged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", content = "value", rename_all = "snake_case")]
pub enum StagedPassword {
    Argon2(String),
    Plaintext(String),
}

impl fmt::Debug for StagedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagedPassword::Argon2(_) => f.write_str("Argon2(..)"),
            StagedPassword::Plaintext(_) => f.write_str("Plaintext(<redacted>)"),
        }
    }
}

/// Profile of the prospective reseller carried by a registration payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    pub email: String,
    pub password: StagedPassword,
    pub name: String,
    pub business_name: String,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Workflow payload of a payment, keyed by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PaymentMetadata {
    Order {
        #[serde(default)]
        user_id: Option<Uuid>,
        #[serde(default)]
        order_id: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    WalletTopup {
        #[serde(default)]
        user_id: Option<Uuid>,
        #[serde(default)]
        description: Option<String>,
    },
    ResellerRegistration(RegistrationData),
}

impl PaymentMetadata {
    pub fn payment_type(&self) -> PaymentType {
        match self {
            PaymentMetadata::Order { .. } => PaymentType::Order,
            PaymentMetadata::WalletTopup { .. } => PaymentType::WalletTopup,
            PaymentMetadata::ResellerRegistration(_) => PaymentType::ResellerRegistration,
        }
    }

    pub fn registration(&self) -> Option<&RegistrationData> {
        match self {
            PaymentMetadata::ResellerRegistration(data) => Some(data),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, ServiceError> {
        serde_json::to_value(self).map_err(|e| ServiceError::Validation(format!("metadata encode: {e}")))
    }
}

/// Staged charge awaiting (or past) gateway confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPayment {
    pub id: Uuid,
    /// Gateway handle, also the identifier shown to the client.
    pub payment_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub metadata: PaymentMetadata,
    pub transaction_id: Option<String>,
    pub hosted_url: String,
    /// Account produced by a completed registration.
    pub user_id: Option<Uuid>,
}

impl PendingPayment {
    pub fn payment_type(&self) -> PaymentType { self.metadata.payment_type() }
}

impl TryFrom<models::payment::Model> for PendingPayment {
    type Error = ServiceError;

    fn try_from(m: models::payment::Model) -> Result<Self, Self::Error> {
        let metadata: PaymentMetadata = serde_json::from_value(m.metadata)
            .map_err(|e| ServiceError::Db(format!("payment {} has undecodable metadata: {e}", m.payment_id)))?;
        Ok(Self {
            id: m.id,
            payment_id: m.payment_id,
            amount: m.amount,
            currency: m.currency,
            status: m.status,
            metadata,
            transaction_id: m.transaction_id,
            hosted_url: m.hosted_url,
            user_id: m.user_id,
        })
    }
}

/// Result the gateway reports for a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayOutcome {
    Success,
    Failure,
    Cancel,
}

impl GatewayOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayOutcome::Success => "success",
            GatewayOutcome::Failure => "failure",
            GatewayOutcome::Cancel => "cancel",
        }
    }

    /// Status a payment settles in for this outcome.
    pub fn terminal_status(self) -> PaymentStatus {
        match self {
            GatewayOutcome::Success => PaymentStatus::Completed,
            GatewayOutcome::Failure => PaymentStatus::Failed,
            GatewayOutcome::Cancel => PaymentStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub amount: i64,
    pub currency: String,
    pub description: String,
    /// Echoed back by the gateway; carries the internal payment record id.
    pub callback_context: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeHandle {
    pub payment_id: String,
    pub hosted_url: String,
}
