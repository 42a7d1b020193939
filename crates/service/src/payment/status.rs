use serde::Serialize;

use super::domain::{PaymentMetadata, PaymentStatus, PendingPayment};

/// Client destinations for settled payments.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    pub registration_success: String,
    pub wallet_success: String,
    pub error: String,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::from_config(&configs::RegistrationConfig::default())
    }
}

impl RedirectPolicy {
    pub fn from_config(cfg: &configs::RegistrationConfig) -> Self {
        Self {
            registration_success: cfg.success_redirect.clone(),
            wallet_success: cfg.wallet_success_redirect.clone(),
            error: cfg.error_redirect.clone(),
        }
    }

    fn success_target(&self, metadata: &PaymentMetadata) -> String {
        match metadata {
            PaymentMetadata::Order { order_id: Some(order_id), .. } => format!("/orders/{order_id}/success"),
            PaymentMetadata::Order { order_id: None, .. } => self.error.clone(),
            PaymentMetadata::WalletTopup { .. } => self.wallet_success.clone(),
            PaymentMetadata::ResellerRegistration(_) => self.registration_success.clone(),
        }
    }

    /// Pending payments point back at the hosted checkout so the client can resume.
    pub fn resolve(&self, payment: &PendingPayment) -> PaymentStatusView {
        let (redirect_url, hosted_url) = match payment.status {
            PaymentStatus::Completed => (Some(self.success_target(&payment.metadata)), None),
            PaymentStatus::Failed | PaymentStatus::Cancelled => (Some(self.error.clone()), None),
            PaymentStatus::Pending => (None, Some(payment.hosted_url.clone())),
        };
        PaymentStatusView {
            payment_id: payment.payment_id.clone(),
            status: payment.status,
            redirect_url,
            hosted_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub payment_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_url: Option<String>,
}

impl PaymentStatusView {
    /// Where the client should go next, whichever kind of target applies.
    pub fn target(&self) -> Option<&str> {
        self.redirect_url.as_deref().or(self.hosted_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::domain::{RegistrationData, StagedPassword};
    use uuid::Uuid;

    fn payment(status: PaymentStatus, metadata: PaymentMetadata) -> PendingPayment {
        PendingPayment {
            id: Uuid::new_v4(),
            payment_id: "PAY1".into(),
            amount: 1000,
            currency: "BDT".into(),
            status,
            metadata,
            transaction_id: None,
            hosted_url: "https://gateway.test/checkout/PAY1".into(),
            user_id: None,
        }
    }

    fn registration() -> PaymentMetadata {
        PaymentMetadata::ResellerRegistration(RegistrationData {
            email: "a@b.com".into(),
            password: StagedPassword::Argon2("h".into()),
            name: "Ann".into(),
            business_name: "Acme".into(),
            domain: None,
        })
    }

    #[test]
    fn pending_points_at_hosted_checkout() {
        let view = RedirectPolicy::default().resolve(&payment(PaymentStatus::Pending, registration()));
        assert_eq!(view.hosted_url.as_deref(), Some("https://gateway.test/checkout/PAY1"));
        assert!(view.redirect_url.is_none());
    }

    #[test]
    fn completed_targets_depend_on_type() {
        let policy = RedirectPolicy::default();
        let reg = policy.resolve(&payment(PaymentStatus::Completed, registration()));
        assert_eq!(reg.target(), Some("/auth/reseller/register/success"));

        let order = PaymentMetadata::Order { user_id: None, order_id: Some("ORD9".into()), description: None };
        assert_eq!(policy.resolve(&payment(PaymentStatus::Completed, order)).target(), Some("/orders/ORD9/success"));

        let orphan = PaymentMetadata::Order { user_id: None, order_id: None, description: None };
        assert_eq!(policy.resolve(&payment(PaymentStatus::Completed, orphan)).target(), Some("/orders/error"));

        let topup = PaymentMetadata::WalletTopup { user_id: None, description: None };
        assert_eq!(policy.resolve(&payment(PaymentStatus::Completed, topup)).target(), Some("/reseller/wallet?status=success"));
    }

    #[test]
    fn failed_and_cancelled_share_error_target() {
        let policy = RedirectPolicy::default();
        for status in [PaymentStatus::Failed, PaymentStatus::Cancelled] {
            let view = policy.resolve(&payment(status, registration()));
            assert_eq!(view.target(), Some("/orders/error"));
            assert!(view.hosted_url.is_none());
        }
    }
}
