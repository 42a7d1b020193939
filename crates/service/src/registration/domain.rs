use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::{store::NewStore, user::NewReseller};

use super::errors::RegistrationError;
use crate::payment::PaymentStatus;

/// Sign-up form of a prospective reseller. Missing fields deserialize as
/// empty so that validation, not the JSON extractor, reports them.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub business_name: String,
    pub domain: Option<String>,
}

impl fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterInput")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("business_name", &self.business_name)
            .field("domain", &self.domain)
            .finish()
    }
}

/// Where the client continues after initiating a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationTicket {
    pub payment_id: String,
    pub redirect_url: String,
}

/// Everything written by one registration commit.
#[derive(Debug, Clone)]
pub struct AccountDraft {
    pub payment_id: String,
    pub transaction_id: String,
    pub reseller: NewReseller,
    pub store: NewStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { user_id: Uuid, store_id: Uuid },
    /// The payment left `pending` before this commit could claim it.
    NotPending,
}

/// Settled state of a payment after a gateway outcome was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport {
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

/// Lowercase hostname with at least two labels, each `[a-z0-9-]` without
/// edge hyphens.
pub fn normalize_custom_domain(raw: &str) -> Result<String, RegistrationError> {
    let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    let invalid = || RegistrationError::Validation(format!("invalid domain: {}", raw.trim()));
    if domain.is_empty() || domain.len() > 253 {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid());
    }
    let label_ok = |l: &&str| {
        !l.is_empty()
            && l.len() <= 63
            && !l.starts_with('-')
            && !l.ends_with('-')
            && l.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    };
    if !labels.iter().all(label_ok) {
        return Err(invalid());
    }
    Ok(domain)
}
