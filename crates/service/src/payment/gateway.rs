use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use super::domain::{ChargeHandle, ChargeRequest};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("gateway rejected charge ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Outbound half of the payment gateway. Outcomes arrive separately through
/// the callback endpoint.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate_charge(&self, req: &ChargeRequest) -> Result<ChargeHandle, GatewayError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody<'a> {
    mode: &'static str,
    #[serde(rename = "callbackURL")]
    callback_url: &'a str,
    amount: String,
    currency: &'a str,
    intent: &'static str,
    merchant_invoice_number: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct CreatePaymentResponse {
    #[serde(rename = "paymentID")]
    payment_id: String,
    #[serde(rename = "bkashURL", alias = "hostedURL")]
    hosted_url: String,
}

/// Tokenised-checkout client talking JSON over HTTPS.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    app_key: String,
    app_secret: String,
    callback_url: String,
}

impl HttpPaymentGateway {
    pub fn new(cfg: &configs::GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            app_key: cfg.app_key.clone(),
            app_secret: cfg.app_secret.clone(),
            callback_url: cfg.callback_url.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, req), fields(amount = req.amount, currency = %req.currency))]
    async fn initiate_charge(&self, req: &ChargeRequest) -> Result<ChargeHandle, GatewayError> {
        let body = CreatePaymentBody {
            mode: "0011",
            callback_url: &self.callback_url,
            amount: req.amount.to_string(),
            currency: &req.currency,
            intent: "sale",
            merchant_invoice_number: &req.callback_context,
            description: &req.description,
        };
        let resp = self
            .client
            .post(format!("{}/checkout/create", self.base_url))
            .header("x-app-key", &self.app_key)
            .bearer_auth(&self.app_secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { status: status.as_u16(), message });
        }
        let parsed = resp
            .json::<CreatePaymentResponse>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;
        debug!(payment_id = %parsed.payment_id, "charge created");
        Ok(ChargeHandle { payment_id: parsed.payment_id, hosted_url: parsed.hosted_url })
    }
}

/// Scriptable gateway for tests and doc examples.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockGateway {
        seq: AtomicU64,
        fail: AtomicBool,
        requests: Mutex<Vec<ChargeRequest>>,
    }

    impl MockGateway {
        /// Make subsequent charges fail with a rejection.
        pub fn fail_charges(&self, fail: bool) { self.fail.store(fail, Ordering::SeqCst); }

        pub fn requests(&self) -> Vec<ChargeRequest> { self.requests.lock().unwrap().clone() }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn initiate_charge(&self, req: &ChargeRequest) -> Result<ChargeHandle, GatewayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Rejected { status: 503, message: "gateway unavailable".into() });
            }
            self.requests.lock().unwrap().push(req.clone());
            let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            let payment_id = format!("MOCKPAY{n:06}");
            let hosted_url = format!("https://gateway.test/checkout/{payment_id}");
            Ok(ChargeHandle { payment_id, hosted_url })
        }
    }
}
