use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{AccountDraft, CommitOutcome};
use crate::errors::ServiceError;
use crate::payment::{PaymentStatus, PendingPayment};
use crate::subdomain::SubdomainProbe;

/// Persistence port of the registration workflow.
///
/// Implementations must enforce uniqueness of email, subdomain, custom domain
/// and store owner, reporting violations as
/// `ServiceError::Model(ModelError::UniqueViolation(index))` with the index
/// names from `models::errors`.
#[async_trait]
pub trait RegistrationRepository: SubdomainProbe {
    /// Whether a confirmed account uses this (normalised) email.
    async fn email_registered(&self, email: &str) -> Result<bool, ServiceError>;
    async fn custom_domain_taken(&self, domain: &str) -> Result<bool, ServiceError>;

    async fn insert_payment(&self, payment: &PendingPayment) -> Result<(), ServiceError>;
    async fn find_payment(&self, payment_id: &str) -> Result<Option<PendingPayment>, ServiceError>;

    /// Atomically claim the pending payment and create the reseller and store.
    /// Nothing is written unless all three writes succeed.
    async fn commit_registration(&self, draft: &AccountDraft) -> Result<CommitOutcome, ServiceError>;

    /// `pending -> completed` for payments without an account side effect.
    /// Returns false when the payment was no longer pending.
    async fn complete_payment(&self, payment_id: &str, transaction_id: &str) -> Result<bool, ServiceError>;
    /// `pending -> failed | cancelled`. Returns false when the payment was no longer pending.
    async fn close_payment(&self, payment_id: &str, status: PaymentStatus) -> Result<bool, ServiceError>;

    async fn admin_ids(&self) -> Result<Vec<Uuid>, ServiceError>;
}

/// In-memory repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use models::errors::{
        ModelError, UNIQ_PAYMENT_PAYMENT_ID, UNIQ_STORE_CUSTOM_DOMAIN, UNIQ_STORE_RESELLER, UNIQ_STORE_SUBDOMAIN,
        UNIQ_USER_EMAIL,
    };
    use models::{store::NewStore, user::NewReseller};

    #[derive(Clone, Default)]
    struct State {
        users: HashMap<Uuid, NewReseller>,
        stores: HashMap<Uuid, NewStore>,
        payments: HashMap<String, PendingPayment>,
        admins: Vec<Uuid>,
        /// Subdomains claimed by a concurrent writer the probe has not seen yet.
        racing: HashSet<String>,
    }

    fn unique(index: &str) -> ServiceError {
        ServiceError::Model(ModelError::UniqueViolation(index.to_string()))
    }

    #[derive(Default)]
    pub struct InMemoryRegistrationRepository {
        state: Mutex<State>,
        fail_after_user: AtomicBool,
    }

    impl InMemoryRegistrationRepository {
        pub fn with_admins(admins: &[Uuid]) -> Self {
            let repo = Self::default();
            repo.state.lock().unwrap().admins = admins.to_vec();
            repo
        }

        /// Make the next commits fail after the reseller row is staged.
        pub fn fail_commits_after_user(&self, fail: bool) { self.fail_after_user.store(fail, Ordering::SeqCst); }

        /// Reserve a subdomain at commit time only, as a concurrent transaction would.
        pub fn race_subdomain(&self, subdomain: &str) {
            self.state.lock().unwrap().racing.insert(subdomain.to_string());
        }

        pub fn user_count(&self) -> usize { self.state.lock().unwrap().users.len() }

        pub fn store_count(&self) -> usize { self.state.lock().unwrap().stores.len() }

        pub fn user(&self, id: Uuid) -> Option<NewReseller> { self.state.lock().unwrap().users.get(&id).cloned() }

        pub fn store_of(&self, reseller_id: Uuid) -> Option<NewStore> {
            self.state.lock().unwrap().stores.values().find(|s| s.reseller_id == reseller_id).cloned()
        }

        pub fn payment(&self, payment_id: &str) -> Option<PendingPayment> {
            self.state.lock().unwrap().payments.get(payment_id).cloned()
        }

        fn stage(&self, state: &mut State, draft: &AccountDraft) -> Result<CommitOutcome, ServiceError> {
            let payment = match state.payments.get_mut(&draft.payment_id) {
                Some(p) if p.status == PaymentStatus::Pending => p,
                Some(_) => return Ok(CommitOutcome::NotPending),
                None => return Err(ServiceError::not_found("payment")),
            };
            payment.status = PaymentStatus::Completed;
            payment.transaction_id = Some(draft.transaction_id.clone());
            payment.user_id = Some(draft.reseller.id);

            let email = models::user::normalize_email(&draft.reseller.email);
            if state.users.values().any(|u| models::user::normalize_email(&u.email) == email) {
                return Err(unique(UNIQ_USER_EMAIL));
            }
            state.users.insert(draft.reseller.id, draft.reseller.clone());
            if self.fail_after_user.load(Ordering::SeqCst) {
                return Err(ServiceError::Db("injected failure after reseller insert".into()));
            }

            let store = &draft.store;
            if state.racing.contains(&store.subdomain) || state.stores.values().any(|s| s.subdomain == store.subdomain) {
                return Err(unique(UNIQ_STORE_SUBDOMAIN));
            }
            if let Some(domain) = &store.custom_domain {
                if state.stores.values().any(|s| s.custom_domain.as_ref() == Some(domain)) {
                    return Err(unique(UNIQ_STORE_CUSTOM_DOMAIN));
                }
            }
            if state.stores.values().any(|s| s.reseller_id == store.reseller_id) {
                return Err(unique(UNIQ_STORE_RESELLER));
            }
            state.stores.insert(store.id, store.clone());
            Ok(CommitOutcome::Committed { user_id: draft.reseller.id, store_id: store.id })
        }
    }

    #[async_trait]
    impl SubdomainProbe for InMemoryRegistrationRepository {
        async fn subdomain_taken(&self, subdomain: &str) -> Result<bool, ServiceError> {
            let state = self.state.lock().unwrap();
            Ok(state.stores.values().any(|s| s.subdomain == subdomain))
        }
    }

    #[async_trait]
    impl RegistrationRepository for InMemoryRegistrationRepository {
        async fn email_registered(&self, email: &str) -> Result<bool, ServiceError> {
            let email = models::user::normalize_email(email);
            let state = self.state.lock().unwrap();
            Ok(state.users.values().any(|u| models::user::normalize_email(&u.email) == email))
        }

        async fn custom_domain_taken(&self, domain: &str) -> Result<bool, ServiceError> {
            let state = self.state.lock().unwrap();
            Ok(state.stores.values().any(|s| s.custom_domain.as_deref() == Some(domain)))
        }

        async fn insert_payment(&self, payment: &PendingPayment) -> Result<(), ServiceError> {
            let mut state = self.state.lock().unwrap();
            if state.payments.contains_key(&payment.payment_id) {
                return Err(unique(UNIQ_PAYMENT_PAYMENT_ID));
            }
            state.payments.insert(payment.payment_id.clone(), payment.clone());
            Ok(())
        }

        async fn find_payment(&self, payment_id: &str) -> Result<Option<PendingPayment>, ServiceError> {
            Ok(self.state.lock().unwrap().payments.get(payment_id).cloned())
        }

        async fn commit_registration(&self, draft: &AccountDraft) -> Result<CommitOutcome, ServiceError> {
            let mut state = self.state.lock().unwrap();
            let mut staged = state.clone();
            let outcome = self.stage(&mut staged, draft)?;
            if matches!(outcome, CommitOutcome::Committed { .. }) {
                *state = staged;
            }
            Ok(outcome)
        }

        async fn complete_payment(&self, payment_id: &str, transaction_id: &str) -> Result<bool, ServiceError> {
            let mut state = self.state.lock().unwrap();
            match state.payments.get_mut(payment_id) {
                Some(p) if p.status == PaymentStatus::Pending => {
                    p.status = PaymentStatus::Completed;
                    p.transaction_id = Some(transaction_id.to_string());
                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Err(ServiceError::not_found("payment")),
            }
        }

        async fn close_payment(&self, payment_id: &str, status: PaymentStatus) -> Result<bool, ServiceError> {
            if !matches!(status, PaymentStatus::Failed | PaymentStatus::Cancelled) {
                return Err(ServiceError::Validation(format!("cannot close payment as {}", status.as_str())));
            }
            let mut state = self.state.lock().unwrap();
            match state.payments.get_mut(payment_id) {
                Some(p) if p.status == PaymentStatus::Pending => {
                    p.status = status;
                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Err(ServiceError::not_found("payment")),
            }
        }

        async fn admin_ids(&self) -> Result<Vec<Uuid>, ServiceError> {
            Ok(self.state.lock().unwrap().admins.clone())
        }
    }
}
