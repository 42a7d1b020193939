use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::domain::RegisterInput;
use super::errors::RegistrationError;
use super::repository::{mock::InMemoryRegistrationRepository, RegistrationRepository};
use super::service::{RegistrationService, RegistrationSettings};
use crate::notification::{mock::RecordingSink, Notification};
use crate::password::CredentialHasher;
use crate::payment::{
    mock::MockGateway, GatewayOutcome, PaymentMetadata, PaymentStatus, PendingPayment, StagedPassword,
};
use crate::subdomain::SubdomainAllocator;

struct Harness {
    svc: Arc<RegistrationService>,
    repo: Arc<InMemoryRegistrationRepository>,
    gateway: Arc<MockGateway>,
    sink: Arc<RecordingSink>,
    admins: Vec<Uuid>,
}

fn cheap_hasher() -> CredentialHasher {
    CredentialHasher::from_config(&configs::PasswordConfig { memory_kib: 8, iterations: 1, parallelism: 1 })
        .expect("hasher params")
}

fn harness_with(settings: RegistrationSettings, allocator: SubdomainAllocator) -> Harness {
    let admins = vec![Uuid::new_v4(), Uuid::new_v4()];
    let repo = Arc::new(InMemoryRegistrationRepository::with_admins(&admins));
    let gateway = Arc::new(MockGateway::default());
    let sink = Arc::new(RecordingSink::default());
    let svc = RegistrationService::new(repo.clone(), gateway.clone(), sink.clone())
        .with_hasher(cheap_hasher())
        .with_allocator(allocator)
        .with_settings(settings);
    Harness { svc: Arc::new(svc), repo, gateway, sink, admins }
}

fn harness() -> Harness {
    harness_with(RegistrationSettings::default(), SubdomainAllocator::default())
}

fn input(email: &str, business_name: &str) -> RegisterInput {
    RegisterInput {
        email: email.into(),
        password: "Secret123".into(),
        name: "Ann Owner".into(),
        business_name: business_name.into(),
        domain: None,
    }
}

async fn wait_for_notifications(sink: &RecordingSink, expected: usize) -> Vec<Notification> {
    for _ in 0..100 {
        let got = sink.delivered();
        if got.len() >= expected {
            return got;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sink.delivered()
}

fn url_safe(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[tokio::test]
async fn initiation_stages_pending_payment_without_account() -> anyhow::Result<()> {
    let h = harness();
    let ticket = h.svc.initiate_registration(input("  Owner@Example.com ", "Acme")).await?;

    let payment = h.repo.payment(&ticket.payment_id).expect("payment staged");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, 1000);
    assert_eq!(payment.currency, "BDT");
    assert_eq!(payment.hosted_url, ticket.redirect_url);
    let data = payment.metadata.registration().expect("registration payload");
    assert_eq!(data.email, "owner@example.com");
    assert!(matches!(data.password, StagedPassword::Argon2(ref phc) if phc.starts_with("$argon2id$")));

    let charge = &h.gateway.requests()[0];
    assert_eq!(charge.description, "Reseller Registration Fee");
    assert_eq!(charge.callback_context, payment.id.to_string());
    assert_eq!(h.repo.user_count(), 0);
    assert_eq!(h.repo.store_count(), 0);
    Ok(())
}

#[tokio::test]
async fn short_non_empty_password_is_accepted() -> anyhow::Result<()> {
    let h = harness();
    let mut short = input("short@b.com", "Acme");
    short.password = "abc1234".into();
    let ticket = h.svc.initiate_registration(short).await?;
    assert!(h.repo.payment(&ticket.payment_id).is_some());
    assert_eq!(h.gateway.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn missing_or_malformed_fields_are_rejected() {
    let h = harness();
    let mut blank = input("a@b.com", "Acme");
    blank.name = "   ".into();
    assert!(matches!(h.svc.initiate_registration(blank).await, Err(RegistrationError::Validation(_))));
    assert!(matches!(h.svc.initiate_registration(RegisterInput::default()).await, Err(RegistrationError::Validation(_))));
    assert!(matches!(h.svc.initiate_registration(input("not-an-email", "Acme")).await, Err(RegistrationError::Validation(_))));

    let mut bad_domain = input("a@b.com", "Acme");
    bad_domain.domain = Some("not a domain".into());
    assert!(matches!(h.svc.initiate_registration(bad_domain).await, Err(RegistrationError::Validation(_))));
    assert!(h.gateway.requests().is_empty());
}

#[tokio::test]
async fn duplicate_email_only_after_account_exists() -> anyhow::Result<()> {
    let h = harness();
    let first = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;
    // an abandoned pending payment does not block a second attempt
    let second = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;
    assert_ne!(first.payment_id, second.payment_id);

    h.svc.complete_registration(&first.payment_id, "TX1").await?;
    let err = h.svc.initiate_registration(input("A@B.com", "Acme")).await.unwrap_err();
    assert!(matches!(err, RegistrationError::DuplicateEmail));

    // the stale second payment cannot create a second account for the email
    let err = h.svc.complete_registration(&second.payment_id, "TX2").await.unwrap_err();
    assert!(matches!(err, RegistrationError::DuplicateEmail));
    assert_eq!(h.repo.payment(&second.payment_id).unwrap().status, PaymentStatus::Pending);
    assert_eq!(h.repo.user_count(), 1);
    Ok(())
}

#[tokio::test]
async fn gateway_failure_stages_nothing() {
    let h = harness();
    h.gateway.fail_charges(true);
    let err = h.svc.initiate_registration(input("a@b.com", "Acme")).await.unwrap_err();
    assert!(matches!(err, RegistrationError::Gateway(_)));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn completion_is_idempotent() -> anyhow::Result<()> {
    let h = harness();
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;

    let first = h.svc.complete_registration(&ticket.payment_id, "TX1").await?;
    let second = h.svc.complete_registration(&ticket.payment_id, "TX1").await?;
    assert_eq!(first, second);
    assert_eq!(h.repo.user_count(), 1);
    assert_eq!(h.repo.store_count(), 1);

    let payment = h.repo.payment(&ticket.payment_id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.transaction_id.as_deref(), Some("TX1"));
    assert_eq!(payment.user_id, Some(first));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_confirmations_create_one_account() -> anyhow::Result<()> {
    let h = harness();
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let svc = h.svc.clone();
            let pid = ticket.payment_id.clone();
            tokio::spawn(async move { svc.complete_registration(&pid, "TX1").await })
        })
        .collect();
    let mut ids = Vec::new();
    for t in tasks {
        ids.push(t.await??);
    }
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(h.repo.user_count(), 1);
    assert_eq!(h.repo.store_count(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn identical_business_names_get_distinct_subdomains() -> anyhow::Result<()> {
    let h = harness();
    let a = h.svc.initiate_registration(input("joe@games.com", "Joe's Games!!")).await?;
    let b = h.svc.initiate_registration(input("jo@games.com", "Joe's Games!!")).await?;

    let (svc_a, svc_b) = (h.svc.clone(), h.svc.clone());
    let ta = tokio::spawn(async move { svc_a.complete_registration(&a.payment_id, "TXA").await });
    let tb = tokio::spawn(async move { svc_b.complete_registration(&b.payment_id, "TXB").await });
    let (ua, ub) = (ta.await??, tb.await??);

    let sa = h.repo.store_of(ua).expect("store a").subdomain;
    let sb = h.repo.store_of(ub).expect("store b").subdomain;
    assert_ne!(sa, sb);
    assert!(url_safe(&sa) && url_safe(&sb), "{sa} {sb}");
    assert!(sa.starts_with("joe-s-games") && sb.starts_with("joe-s-games"));
    Ok(())
}

#[tokio::test]
async fn subdomain_lost_at_commit_is_retried() -> anyhow::Result<()> {
    let h = harness();
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;
    h.repo.race_subdomain("acme");

    let user_id = h.svc.complete_registration(&ticket.payment_id, "TX1").await?;
    assert_eq!(h.repo.store_of(user_id).unwrap().subdomain, "acme1");
    Ok(())
}

#[tokio::test]
async fn empty_business_name_seed_uses_fallback() -> anyhow::Result<()> {
    let h = harness();
    let ticket = h.svc.initiate_registration(input("a@b.com", "!!!")).await?;
    let user_id = h.svc.complete_registration(&ticket.payment_id, "TX1").await?;
    assert_eq!(h.repo.store_of(user_id).unwrap().subdomain, "store");
    Ok(())
}

#[tokio::test]
async fn allocation_exhaustion_leaves_payment_pending() -> anyhow::Result<()> {
    let h = harness_with(RegistrationSettings::default(), SubdomainAllocator::new(20, 2));
    for (email, tx) in [("one@b.com", "TX1"), ("two@b.com", "TX2")] {
        let t = h.svc.initiate_registration(input(email, "Acme")).await?;
        h.svc.complete_registration(&t.payment_id, tx).await?;
    }
    let third = h.svc.initiate_registration(input("three@b.com", "Acme")).await?;
    let err = h.svc.complete_registration(&third.payment_id, "TX3").await.unwrap_err();
    assert!(matches!(err, RegistrationError::AllocationExhausted { attempts: 2, .. }));
    assert_eq!(h.repo.payment(&third.payment_id).unwrap().status, PaymentStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn failed_commit_leaves_nothing_behind() -> anyhow::Result<()> {
    let h = harness();
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;

    h.repo.fail_commits_after_user(true);
    let err = h.svc.complete_registration(&ticket.payment_id, "TX1").await.unwrap_err();
    assert!(matches!(err, RegistrationError::Repository(_)));
    assert_eq!(h.repo.user_count(), 0);
    assert_eq!(h.repo.store_count(), 0);
    assert!(!h.repo.email_registered("a@b.com").await?);
    let payment = h.repo.payment(&ticket.payment_id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(payment.transaction_id.is_none());

    // the gateway retries once the store recovers
    h.repo.fail_commits_after_user(false);
    h.svc.complete_registration(&ticket.payment_id, "TX1").await?;
    assert_eq!(h.repo.user_count(), 1);
    Ok(())
}

#[tokio::test]
async fn stale_confirmation_after_cancel_is_rejected() -> anyhow::Result<()> {
    let h = harness();
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;

    let report = h.svc.apply_gateway_outcome(&ticket.payment_id, None, GatewayOutcome::Cancel).await?;
    assert_eq!(report.status, PaymentStatus::Cancelled);
    // cancel replays are accepted
    h.svc.apply_gateway_outcome(&ticket.payment_id, None, GatewayOutcome::Cancel).await?;

    let err = h.svc.complete_registration(&ticket.payment_id, "TX1").await.unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidState { status: PaymentStatus::Cancelled, .. }));
    let err = h.svc.apply_gateway_outcome(&ticket.payment_id, None, GatewayOutcome::Failure).await.unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidState { .. }));
    assert_eq!(h.repo.user_count(), 0);
    Ok(())
}

#[tokio::test]
async fn completion_of_other_workflows_is_rejected() -> anyhow::Result<()> {
    let h = harness();
    h.repo.insert_payment(&order_payment("ORDPAY1", Some("ORD-1"))).await?;
    let err = h.svc.complete_registration("ORDPAY1", "TX1").await.unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidPaymentType { .. }));

    let err = h.svc.complete_registration("missing", "TX1").await.unwrap_err();
    assert!(matches!(err, RegistrationError::NotFound(_)));
    Ok(())
}

fn order_payment(payment_id: &str, order_id: Option<&str>) -> PendingPayment {
    PendingPayment {
        id: Uuid::new_v4(),
        payment_id: payment_id.into(),
        amount: 250,
        currency: "BDT".into(),
        status: PaymentStatus::Pending,
        metadata: PaymentMetadata::Order { user_id: None, order_id: order_id.map(str::to_string), description: None },
        transaction_id: None,
        hosted_url: format!("https://gateway.test/checkout/{payment_id}"),
        user_id: None,
    }
}

#[tokio::test]
async fn status_resolution_follows_lifecycle() -> anyhow::Result<()> {
    let h = harness();
    assert!(matches!(h.svc.resolve_status("nope").await, Err(RegistrationError::NotFound(_))));

    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;
    let pending = h.svc.resolve_status(&ticket.payment_id).await?;
    assert_eq!(pending.status, PaymentStatus::Pending);
    assert_eq!(pending.hosted_url.as_deref(), Some(ticket.redirect_url.as_str()));

    h.svc.complete_registration(&ticket.payment_id, "TX1").await?;
    let done = h.svc.resolve_status(&ticket.payment_id).await?;
    assert_eq!(done.redirect_url.as_deref(), Some("/auth/reseller/register/success"));

    h.repo.insert_payment(&order_payment("ORDPAY2", Some("ORD-2"))).await?;
    h.svc.apply_gateway_outcome("ORDPAY2", Some("TXO"), GatewayOutcome::Success).await?;
    let order = h.svc.resolve_status("ORDPAY2").await?;
    assert_eq!(order.redirect_url.as_deref(), Some("/orders/ORD-2/success"));
    Ok(())
}

#[tokio::test]
async fn order_outcomes_settle_without_accounts() -> anyhow::Result<()> {
    let h = harness();
    h.repo.insert_payment(&order_payment("ORDPAY3", None)).await?;

    let err = h.svc.apply_gateway_outcome("ORDPAY3", None, GatewayOutcome::Success).await.unwrap_err();
    assert!(matches!(err, RegistrationError::Validation(_)));

    let report = h.svc.apply_gateway_outcome("ORDPAY3", Some("TXO"), GatewayOutcome::Success).await?;
    assert_eq!(report.status, PaymentStatus::Completed);
    assert!(report.user_id.is_none());
    // replayed success is fine, a late failure is not
    h.svc.apply_gateway_outcome("ORDPAY3", Some("TXO"), GatewayOutcome::Success).await?;
    let err = h.svc.apply_gateway_outcome("ORDPAY3", None, GatewayOutcome::Failure).await.unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidState { status: PaymentStatus::Completed, .. }));
    assert_eq!(h.repo.user_count(), 0);
    Ok(())
}

#[tokio::test]
async fn notifications_reach_admins_and_reseller() -> anyhow::Result<()> {
    let h = harness();
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;
    let user_id = h.svc.complete_registration(&ticket.payment_id, "TX1").await?;

    let delivered = wait_for_notifications(&h.sink, 3).await;
    assert_eq!(delivered.len(), 3);
    for admin in &h.admins {
        let notes = h.sink.for_user(*admin);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "New Reseller Registration");
        assert_eq!(notes[0].metadata["resellerId"], user_id.to_string());
        assert_eq!(notes[0].metadata["businessName"], "Acme");
    }
    let mine = h.sink.for_user(user_id);
    assert_eq!(mine[0].title, "Registration Successful");
    assert_eq!(mine[0].metadata["storeDomain"], "acme.yourdomain.com");
    Ok(())
}

#[tokio::test]
async fn drain_waits_for_spawned_notifications() -> anyhow::Result<()> {
    let h = harness();
    assert!(h.svc.drain_notifications(Duration::from_millis(10)).await);
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;
    h.svc.complete_registration(&ticket.payment_id, "TX1").await?;

    assert!(h.svc.drain_notifications(Duration::from_secs(2)).await);
    assert_eq!(h.svc.notifications_in_flight(), 0);
    assert_eq!(h.sink.delivered().len(), h.admins.len() + 1);
    Ok(())
}

#[tokio::test]
async fn notification_failure_does_not_fail_registration() -> anyhow::Result<()> {
    let h = harness();
    h.sink.reject_user(h.admins[0]);
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;
    let user_id = h.svc.complete_registration(&ticket.payment_id, "TX1").await?;

    let delivered = wait_for_notifications(&h.sink, 2).await;
    assert_eq!(delivered.len(), 2);
    assert!(h.sink.for_user(h.admins[0]).is_empty());
    assert_eq!(h.sink.for_user(user_id).len(), 1);
    assert_eq!(h.repo.user_count(), 1);
    Ok(())
}

#[tokio::test]
async fn custom_domain_conflicts() -> anyhow::Result<()> {
    let h = harness();
    let mut first = input("a@b.com", "Acme");
    first.domain = Some("Shop.Acme.io".into());
    let mut second = input("c@d.com", "Other");
    second.domain = Some("shop.acme.io".into());

    // both staged before either store exists
    let t1 = h.svc.initiate_registration(first.clone()).await?;
    let t2 = h.svc.initiate_registration(second.clone()).await?;
    let u1 = h.svc.complete_registration(&t1.payment_id, "TX1").await?;
    assert_eq!(h.repo.store_of(u1).unwrap().custom_domain.as_deref(), Some("shop.acme.io"));

    // now taken: rejected at initiation
    second.email = "e@f.com".into();
    let err = h.svc.initiate_registration(second).await.unwrap_err();
    assert!(matches!(err, RegistrationError::Validation(ref m) if m.contains("domain already in use")));

    // already paid: committed without the domain, and told so
    let u2 = h.svc.complete_registration(&t2.payment_id, "TX2").await?;
    let store = h.repo.store_of(u2).unwrap();
    assert!(store.custom_domain.is_none());
    assert_eq!(store.subdomain, "other");
    wait_for_notifications(&h.sink, 6).await;
    let note = &h.sink.for_user(u2)[0];
    assert!(note.message.contains("shop.acme.io"), "{}", note.message);
    Ok(())
}

#[tokio::test]
async fn deferred_hashing_hashes_at_completion() -> anyhow::Result<()> {
    let settings = RegistrationSettings { hash_eagerly: false, ..RegistrationSettings::default() };
    let h = harness_with(settings, SubdomainAllocator::default());
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;
    let staged = h.repo.payment(&ticket.payment_id).unwrap();
    assert!(matches!(
        staged.metadata.registration().unwrap().password,
        StagedPassword::Plaintext(ref p) if p == "Secret123"
    ));

    let user_id = h.svc.complete_registration(&ticket.payment_id, "TX1").await?;
    let user = h.repo.user(user_id).unwrap();
    assert_ne!(user.password_hash, "Secret123");
    assert!(cheap_hasher().verify("Secret123", &user.password_hash)?);
    Ok(())
}

#[tokio::test]
async fn end_to_end_gateway_success_and_replay() -> anyhow::Result<()> {
    let h = harness();
    let ticket = h.svc.initiate_registration(input("a@b.com", "Acme")).await?;

    let first = h.svc.apply_gateway_outcome(&ticket.payment_id, Some("TX1"), GatewayOutcome::Success).await?;
    assert_eq!(first.status, PaymentStatus::Completed);
    let user_id = first.user_id.expect("account created");

    let replay = h.svc.apply_gateway_outcome(&ticket.payment_id, Some("TX1"), GatewayOutcome::Success).await?;
    assert_eq!(replay.user_id, Some(user_id));
    assert_eq!(h.repo.store_count(), 1);

    let user = h.repo.user(user_id).unwrap();
    assert_eq!(user.email, "a@b.com");
    assert_eq!(user.wallet_currency, "BDT");
    let store = h.repo.store_of(user_id).unwrap();
    assert_eq!(store.subdomain, "acme");
    assert_eq!(store.name, "Acme");
    assert_eq!(store.pricing, models::store::PricingPolicy::default());
    Ok(())
}
