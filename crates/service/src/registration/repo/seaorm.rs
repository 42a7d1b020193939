use async_trait::async_trait;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::debug;
use uuid::Uuid;

use models::{payment, store, user};

use crate::errors::ServiceError;
use crate::payment::{PaymentStatus, PendingPayment};
use crate::registration::domain::{AccountDraft, CommitOutcome};
use crate::registration::repository::RegistrationRepository;
use crate::subdomain::SubdomainProbe;

pub struct SeaOrmRegistrationRepository {
    pub db: DatabaseConnection,
}

#[async_trait]
impl SubdomainProbe for SeaOrmRegistrationRepository {
    async fn subdomain_taken(&self, subdomain: &str) -> Result<bool, ServiceError> {
        Ok(store::subdomain_exists(&self.db, subdomain).await?)
    }
}

#[async_trait]
impl RegistrationRepository for SeaOrmRegistrationRepository {
    async fn email_registered(&self, email: &str) -> Result<bool, ServiceError> {
        Ok(user::email_exists(&self.db, email).await?)
    }

    async fn custom_domain_taken(&self, domain: &str) -> Result<bool, ServiceError> {
        Ok(store::custom_domain_exists(&self.db, domain).await?)
    }

    async fn insert_payment(&self, p: &PendingPayment) -> Result<(), ServiceError> {
        payment::create(
            &self.db,
            payment::NewPayment {
                id: p.id,
                payment_id: p.payment_id.clone(),
                payment_type: p.payment_type(),
                amount: p.amount,
                currency: p.currency.clone(),
                metadata: p.metadata.to_json()?,
                hosted_url: p.hosted_url.clone(),
            },
        )
        .await?;
        Ok(())
    }

    async fn find_payment(&self, payment_id: &str) -> Result<Option<PendingPayment>, ServiceError> {
        payment::find_by_payment_id(&self.db, payment_id)
            .await?
            .map(PendingPayment::try_from)
            .transpose()
    }

    async fn commit_registration(&self, draft: &AccountDraft) -> Result<CommitOutcome, ServiceError> {
        let txn = self.db.begin().await?;
        // Claim the payment first; the row lock serializes concurrent confirmations.
        let claimed = payment::complete_if_pending(&txn, &draft.payment_id, &draft.transaction_id, Some(draft.reseller.id)).await;
        match claimed {
            Ok(0) => {
                txn.rollback().await?;
                debug!(payment_id = %draft.payment_id, "payment no longer pending");
                return Ok(CommitOutcome::NotPending);
            }
            Ok(_) => {}
            Err(e) => {
                txn.rollback().await?;
                return Err(e.into());
            }
        }

        let staged = async {
            let reseller = user::create_reseller(&txn, draft.reseller.clone()).await?;
            let store = store::create(&txn, draft.store.clone()).await?;
            Ok::<_, models::errors::ModelError>((reseller.id, store.id))
        }
        .await;

        match staged {
            Ok((user_id, store_id)) => {
                txn.commit().await?;
                Ok(CommitOutcome::Committed { user_id, store_id })
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e.into())
            }
        }
    }

    async fn complete_payment(&self, payment_id: &str, transaction_id: &str) -> Result<bool, ServiceError> {
        Ok(payment::complete_if_pending(&self.db, payment_id, transaction_id, None).await? == 1)
    }

    async fn close_payment(&self, payment_id: &str, status: PaymentStatus) -> Result<bool, ServiceError> {
        Ok(payment::close_if_pending(&self.db, payment_id, status).await? == 1)
    }

    async fn admin_ids(&self) -> Result<Vec<Uuid>, ServiceError> {
        Ok(user::admin_ids(&self.db).await?)
    }
}
