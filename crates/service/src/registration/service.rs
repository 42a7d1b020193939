use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use common::metrics::{
    GATEWAY_OUTCOMES_TOTAL, NOTIFICATION_FAILURES_TOTAL, REGISTRATIONS_COMPLETED_TOTAL, REGISTRATIONS_INITIATED_TOTAL,
    REGISTRATION_REPLAYS_TOTAL, SUBDOMAIN_CONFLICTS_TOTAL,
};
use models::{
    store::NewStore,
    user::{self, NewReseller},
};

use super::domain::{
    normalize_custom_domain, AccountDraft, CommitOutcome, OutcomeReport, RegisterInput, RegistrationTicket,
};
use super::errors::{ConflictKind, RegistrationError};
use super::repository::RegistrationRepository;
use crate::errors::ServiceError;
use crate::notification::{Notification, NotificationSink};
use crate::password::CredentialHasher;
use crate::payment::{
    ChargeRequest, GatewayOutcome, PaymentGateway, PaymentMetadata, PaymentStatus, PaymentStatusView, PendingPayment,
    RedirectPolicy, RegistrationData, StagedPassword,
};
use crate::subdomain::SubdomainAllocator;

pub const REGISTRATION_FEE_DESCRIPTION: &str = "Reseller Registration Fee";

/// Charge and provisioning parameters of the registration workflow.
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    pub fee: i64,
    pub currency: String,
    /// Stage an argon2 hash instead of the plaintext password.
    pub hash_eagerly: bool,
    pub store_base_domain: String,
}

impl Default for RegistrationSettings {
    fn default() -> Self { Self::from_config(&configs::RegistrationConfig::default()) }
}

impl RegistrationSettings {
    pub fn from_config(cfg: &configs::RegistrationConfig) -> Self {
        Self {
            fee: cfg.fee,
            currency: cfg.currency.clone(),
            hash_eagerly: cfg.hash_eagerly,
            store_base_domain: cfg.store_base_domain.clone(),
        }
    }
}

/// Notification batches spawned after commit and not yet finished.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: tokio::sync::Notify,
}

impl InFlight {
    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Payment-gated reseller onboarding, independent of the web framework.
///
/// Nothing durable is created until the gateway confirms the fee; the
/// confirmed payment is then turned into a reseller account and its store
/// exactly once, however often the confirmation is delivered.
pub struct RegistrationService {
    repo: Arc<dyn RegistrationRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSink>,
    hasher: CredentialHasher,
    allocator: SubdomainAllocator,
    redirects: RedirectPolicy,
    settings: RegistrationSettings,
    in_flight: Arc<InFlight>,
}

impl RegistrationService {
    pub fn new(
        repo: Arc<dyn RegistrationRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            repo,
            gateway,
            notifier,
            hasher: CredentialHasher::default(),
            allocator: SubdomainAllocator::default(),
            redirects: RedirectPolicy::default(),
            settings: RegistrationSettings::default(),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Wire every tunable from the application config.
    pub fn from_config(
        repo: Arc<dyn RegistrationRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSink>,
        cfg: &configs::AppConfig,
    ) -> Result<Self, RegistrationError> {
        Ok(Self::new(repo, gateway, notifier)
            .with_hasher(CredentialHasher::from_config(&cfg.password)?)
            .with_allocator(SubdomainAllocator::from_config(&cfg.registration))
            .with_redirects(RedirectPolicy::from_config(&cfg.registration))
            .with_settings(RegistrationSettings::from_config(&cfg.registration)))
    }

    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self { self.hasher = hasher; self }

    pub fn with_allocator(mut self, allocator: SubdomainAllocator) -> Self { self.allocator = allocator; self }

    pub fn with_redirects(mut self, redirects: RedirectPolicy) -> Self { self.redirects = redirects; self }

    pub fn with_settings(mut self, settings: RegistrationSettings) -> Self { self.settings = settings; self }

    pub fn notifications_in_flight(&self) -> usize { self.in_flight.count.load(Ordering::SeqCst) }

    /// Wait for spawned notification batches to finish. Returns false if
    /// some were still running when `grace` ran out.
    pub async fn drain_notifications(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.in_flight.wait_idle()).await.is_ok()
    }

    /// Validate the sign-up form, stage it in a pending payment and return the
    /// gateway checkout the client must visit.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::notification::mock::RecordingSink;
    /// use service::payment::mock::MockGateway;
    /// use service::registration::{domain::RegisterInput, repository::mock::InMemoryRegistrationRepository, RegistrationService};
    ///
    /// let svc = RegistrationService::new(
    ///     Arc::new(InMemoryRegistrationRepository::default()),
    ///     Arc::new(MockGateway::default()),
    ///     Arc::new(RecordingSink::default()),
    /// );
    /// let input = RegisterInput {
    ///     email: "owner@example.com".into(),
    ///     password: "Secret123".into(),
    ///     name: "Owner".into(),
    ///     business_name: "Acme Games".into(),
    ///     domain: None,
    /// };
    /// let ticket = tokio_test::block_on(svc.initiate_registration(input)).unwrap();
    /// assert!(ticket.redirect_url.contains(&ticket.payment_id));
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn initiate_registration(&self, input: RegisterInput) -> Result<RegistrationTicket, RegistrationError> {
        let email = user::normalize_email(&input.email);
        let name = input.name.trim().to_string();
        let business_name = input.business_name.trim().to_string();
        if email.is_empty() || input.password.is_empty() || name.is_empty() || business_name.is_empty() {
            return Err(RegistrationError::Validation("All required fields must be provided".into()));
        }
        user::validate_email(&email).map_err(ServiceError::from)?;
        user::validate_name(&name).map_err(ServiceError::from)?;
        user::validate_name(&business_name).map_err(ServiceError::from)?;

        let domain = match input.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => {
                let domain = normalize_custom_domain(raw)?;
                if self.repo.custom_domain_taken(&domain).await? {
                    return Err(RegistrationError::Validation("domain already in use".into()));
                }
                Some(domain)
            }
            None => None,
        };

        // Only confirmed accounts block; abandoned payments with this email do not.
        if self.repo.email_registered(&email).await? {
            return Err(RegistrationError::DuplicateEmail);
        }

        let password = if self.settings.hash_eagerly {
            StagedPassword::Argon2(self.hasher.hash_blocking(input.password).await?)
        } else {
            StagedPassword::Plaintext(input.password)
        };
        let metadata = PaymentMetadata::ResellerRegistration(RegistrationData {
            email,
            password,
            name,
            business_name,
            domain,
        });

        let record_id = Uuid::new_v4();
        let handle = self
            .gateway
            .initiate_charge(&ChargeRequest {
                amount: self.settings.fee,
                currency: self.settings.currency.clone(),
                description: REGISTRATION_FEE_DESCRIPTION.into(),
                callback_context: record_id.to_string(),
            })
            .await?;

        let payment = PendingPayment {
            id: record_id,
            payment_id: handle.payment_id.clone(),
            amount: self.settings.fee,
            currency: self.settings.currency.clone(),
            status: PaymentStatus::Pending,
            metadata,
            transaction_id: None,
            hosted_url: handle.hosted_url.clone(),
            user_id: None,
        };
        self.repo.insert_payment(&payment).await?;

        REGISTRATIONS_INITIATED_TOTAL.inc();
        info!(payment_id = %payment.payment_id, amount = payment.amount, currency = %payment.currency, "registration_initiated");
        Ok(RegistrationTicket { payment_id: handle.payment_id, redirect_url: handle.hosted_url })
    }

    /// Current state of a payment and where the client should go next. Read-only.
    #[instrument(skip(self))]
    pub async fn resolve_status(&self, payment_id: &str) -> Result<PaymentStatusView, RegistrationError> {
        let payment = self.load(payment_id).await?;
        Ok(self.redirects.resolve(&payment))
    }

    /// Turn a confirmed registration payment into a reseller and store.
    ///
    /// Replays for an already completed payment return the account created
    /// the first time; confirmations for failed or cancelled payments are
    /// rejected. Any failure leaves the payment `pending`.
    #[instrument(skip(self))]
    pub async fn complete_registration(&self, payment_id: &str, transaction_id: &str) -> Result<Uuid, RegistrationError> {
        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() {
            return Err(RegistrationError::Validation("transaction id is required".into()));
        }
        let payment = self.load(payment_id).await?;
        let Some(data) = payment.metadata.registration() else {
            return Err(RegistrationError::InvalidPaymentType {
                payment_id: payment.payment_id.clone(),
                found: payment.payment_type(),
            });
        };
        match payment.status {
            PaymentStatus::Completed => return self.replayed(&payment),
            PaymentStatus::Failed | PaymentStatus::Cancelled => {
                warn!(status = payment.status.as_str(), "stale registration confirmation");
                return Err(RegistrationError::InvalidState { payment_id: payment.payment_id.clone(), status: payment.status });
            }
            PaymentStatus::Pending => {}
        }

        let password_hash = match &data.password {
            StagedPassword::Argon2(phc) => phc.clone(),
            StagedPassword::Plaintext(plain) => self.hasher.hash_blocking(plain.clone()).await?,
        };
        let reseller = NewReseller {
            id: Uuid::new_v4(),
            email: user::normalize_email(&data.email),
            password_hash,
            name: data.name.clone(),
            business_name: data.business_name.clone(),
            wallet_currency: self.settings.currency.clone(),
        };

        let mut custom_domain = data.domain.clone();
        let mut dropped_domain = None;
        let mut next_attempt = 0;
        let (user_id, subdomain) = loop {
            let alloc = self.allocator.allocate_from(&data.business_name, next_attempt, self.repo.as_ref()).await?;
            let draft = AccountDraft {
                payment_id: payment.payment_id.clone(),
                transaction_id: transaction_id.to_string(),
                reseller: reseller.clone(),
                store: NewStore::with_defaults(reseller.id, &data.business_name, &alloc.subdomain, custom_domain.clone()),
            };
            match self.repo.commit_registration(&draft).await {
                Ok(CommitOutcome::Committed { user_id, store_id }) => {
                    info!(%user_id, %store_id, subdomain = %alloc.subdomain, "registration_completed");
                    break (user_id, alloc.subdomain);
                }
                Ok(CommitOutcome::NotPending) => return self.after_lost_claim(&payment.payment_id).await,
                Err(e) => match RegistrationError::from(e) {
                    RegistrationError::PersistenceConflict(ConflictKind::Subdomain) => {
                        SUBDOMAIN_CONFLICTS_TOTAL.inc();
                        info!(subdomain = %alloc.subdomain, attempt = alloc.attempt, "subdomain_conflict_retry");
                        next_attempt = alloc.attempt + 1;
                    }
                    RegistrationError::PersistenceConflict(ConflictKind::CustomDomain) if custom_domain.is_some() => {
                        warn!(domain = ?custom_domain, "custom domain claimed concurrently, committing without it");
                        dropped_domain = custom_domain.take();
                        next_attempt = alloc.attempt;
                    }
                    RegistrationError::PersistenceConflict(ConflictKind::Email) => {
                        return Err(RegistrationError::DuplicateEmail);
                    }
                    other => return Err(other),
                },
            }
        };

        REGISTRATIONS_COMPLETED_TOTAL.inc();
        let full_domain = format!("{subdomain}.{}", self.settings.store_base_domain);
        self.dispatch_notifications(user_id, data, full_domain, dropped_domain);
        Ok(user_id)
    }

    /// Route a gateway outcome. Success on a registration provisions the
    /// account; other payment types only settle. Replays of an outcome the
    /// payment already settled with are accepted.
    #[instrument(skip(self, outcome), fields(outcome = outcome.as_str()))]
    pub async fn apply_gateway_outcome(
        &self,
        payment_id: &str,
        transaction_id: Option<&str>,
        outcome: GatewayOutcome,
    ) -> Result<OutcomeReport, RegistrationError> {
        GATEWAY_OUTCOMES_TOTAL.with_label_values(&[outcome.as_str()]).inc();
        let payment = self.load(payment_id).await?;

        match outcome {
            GatewayOutcome::Success => {
                let tx = transaction_id
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| RegistrationError::Validation("transactionId is required on success".into()))?;
                if payment.metadata.registration().is_some() {
                    let user_id = self.complete_registration(&payment.payment_id, tx).await?;
                    return Ok(OutcomeReport { status: PaymentStatus::Completed, user_id: Some(user_id) });
                }
                if payment.status == PaymentStatus::Pending && self.repo.complete_payment(&payment.payment_id, tx).await? {
                    info!(payment_type = ?payment.payment_type(), "payment_completed");
                    return Ok(OutcomeReport { status: PaymentStatus::Completed, user_id: None });
                }
                self.settled_as(&payment.payment_id, PaymentStatus::Completed).await
            }
            GatewayOutcome::Failure | GatewayOutcome::Cancel => {
                let target = outcome.terminal_status();
                if payment.status == PaymentStatus::Pending && self.repo.close_payment(&payment.payment_id, target).await? {
                    info!(status = target.as_str(), "payment_closed");
                    return Ok(OutcomeReport { status: target, user_id: None });
                }
                self.settled_as(&payment.payment_id, target).await
            }
        }
    }

    async fn load(&self, payment_id: &str) -> Result<PendingPayment, RegistrationError> {
        let payment_id = payment_id.trim();
        if payment_id.is_empty() {
            return Err(RegistrationError::Validation("Payment ID is required".into()));
        }
        self.repo
            .find_payment(payment_id)
            .await?
            .ok_or_else(|| RegistrationError::NotFound(payment_id.to_string()))
    }

    fn replayed(&self, payment: &PendingPayment) -> Result<Uuid, RegistrationError> {
        match payment.user_id {
            Some(user_id) => {
                REGISTRATION_REPLAYS_TOTAL.inc();
                info!(%user_id, "registration_replay");
                Ok(user_id)
            }
            None => Err(RegistrationError::Repository(format!(
                "completed registration {} has no account",
                payment.payment_id
            ))),
        }
    }

    /// Another confirmation claimed the payment between our read and our commit.
    async fn after_lost_claim(&self, payment_id: &str) -> Result<Uuid, RegistrationError> {
        let current = self.load(payment_id).await?;
        match current.status {
            PaymentStatus::Completed => self.replayed(&current),
            status => Err(RegistrationError::InvalidState { payment_id: current.payment_id, status }),
        }
    }

    async fn settled_as(&self, payment_id: &str, expected: PaymentStatus) -> Result<OutcomeReport, RegistrationError> {
        let current = self.load(payment_id).await?;
        if current.status == expected {
            return Ok(OutcomeReport { status: expected, user_id: current.user_id });
        }
        warn!(status = current.status.as_str(), expected = expected.as_str(), "conflicting gateway outcome");
        Err(RegistrationError::InvalidState { payment_id: current.payment_id, status: current.status })
    }

    /// Admin notices and the reseller's confirmation, off the request path.
    fn dispatch_notifications(
        &self,
        reseller_id: Uuid,
        data: &RegistrationData,
        full_domain: String,
        dropped_domain: Option<String>,
    ) {
        let repo = Arc::clone(&self.repo);
        let notifier = Arc::clone(&self.notifier);
        let name = data.name.clone();
        let business_name = data.business_name.clone();
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.count.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let admins = match repo.admin_ids().await {
                Ok(ids) => ids,
                Err(e) => {
                    NOTIFICATION_FAILURES_TOTAL.inc();
                    warn!(error = %e, "admin lookup failed, skipping admin notices");
                    Vec::new()
                }
            };
            let mut batch: Vec<Notification> = admins
                .into_iter()
                .map(|admin_id| Notification {
                    user_id: admin_id,
                    title: "New Reseller Registration".into(),
                    message: format!("{name} has registered as a reseller. Review pending."),
                    kind: "system".into(),
                    metadata: json!({
                        "resellerId": reseller_id,
                        "resellerName": name,
                        "businessName": business_name,
                        "role": "admin",
                    }),
                })
                .collect();

            let mut message = String::from("Your reseller application has been submitted. We will review it shortly.");
            if let Some(domain) = &dropped_domain {
                message.push_str(&format!(
                    " The domain {domain} is already used by another store, so your store was created at {full_domain}."
                ));
            }
            batch.push(Notification {
                user_id: reseller_id,
                title: "Registration Successful".into(),
                message,
                kind: "system".into(),
                metadata: json!({ "role": "reseller", "storeDomain": full_domain }),
            });

            let total = batch.len();
            let mut failed = 0;
            for n in batch {
                let user_id = n.user_id;
                if let Err(e) = notifier.notify(n).await {
                    failed += 1;
                    NOTIFICATION_FAILURES_TOTAL.inc();
                    warn!(%user_id, error = %e, "notification_failed");
                }
            }
            debug!(%reseller_id, total, failed, "notification_batch_finished");
            in_flight.finish();
        });
    }
}
