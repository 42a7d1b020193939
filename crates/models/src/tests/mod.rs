//! Database-backed tests. They skip when `SKIP_DB_TESTS` is set or no
//! Postgres is reachable at `DATABASE_URL`.

use crate::db::connect;
use crate::errors::{UNIQ_STORE_SUBDOMAIN, UNIQ_USER_EMAIL};
use crate::{payment, store, user};
use anyhow::Result;
use migration::MigratorTrait;
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use uuid::Uuid;

async fn setup_test_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let db = match connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skip: cannot connect to db: {}", e);
            return None;
        }
    };
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("skip: migrate up failed: {}", e);
        return None;
    }
    Some(db)
}

fn reseller(email: &str) -> user::NewReseller {
    user::NewReseller {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".into(),
        name: "Test Reseller".into(),
        business_name: "Test Biz".into(),
        wallet_currency: "BDT".into(),
    }
}

/// Rolled-back reseller and store leave no trace.
#[tokio::test]
async fn test_account_pair_rollback() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let email = format!("rollback_{}@example.com", Uuid::new_v4());
    let txn = db.begin().await?;
    let u = user::create_reseller(&txn, reseller(&email)).await?;
    let sub = format!("rb{}", &Uuid::new_v4().simple().to_string()[..12]);
    let s = store::create(&txn, store::NewStore::with_defaults(u.id, "Rollback", &sub, None)).await?;
    txn.rollback().await?;

    assert!(user::Entity::find_by_id(u.id).one(&db).await?.is_none());
    assert!(store::Entity::find_by_id(s.id).one(&db).await?.is_none());
    assert!(!user::email_exists(&db, &email).await?);
    Ok(())
}

/// Unique index violations are reported by index name.
#[tokio::test]
async fn test_unique_violations_are_classified() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let email = format!("dup_{}@example.com", Uuid::new_v4());
    let first = user::create_reseller(&db, reseller(&email)).await?;
    let err = user::create_reseller(&db, reseller(&email.to_uppercase())).await.unwrap_err();
    assert!(err.is_unique_violation_of(UNIQ_USER_EMAIL), "got {err:?}");

    let sub = format!("dup{}", &Uuid::new_v4().simple().to_string()[..12]);
    store::create(&db, store::NewStore::with_defaults(first.id, "Dup", &sub, None)).await?;
    let other = user::create_reseller(&db, reseller(&format!("dup_{}@example.com", Uuid::new_v4()))).await?;
    let err = store::create(&db, store::NewStore::with_defaults(other.id, "Dup 2", &sub, None)).await.unwrap_err();
    assert!(err.is_unique_violation_of(UNIQ_STORE_SUBDOMAIN), "got {err:?}");
    assert!(store::subdomain_exists(&db, &sub).await?);
    Ok(())
}

/// The status guard lets exactly one transition through.
#[tokio::test]
async fn test_payment_status_guard() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let pid = format!("TEST{}", Uuid::new_v4().simple());
    payment::create(
        &db,
        payment::NewPayment {
            id: Uuid::new_v4(),
            payment_id: pid.clone(),
            payment_type: payment::PaymentType::WalletTopup,
            amount: 500,
            currency: "BDT".into(),
            metadata: serde_json::json!({"type": "wallet_topup", "userId": Uuid::new_v4()}),
            hosted_url: "https://pay.example/checkout".into(),
        },
    )
    .await?;

    assert_eq!(payment::complete_if_pending(&db, &pid, "TX1", None).await?, 1);
    assert_eq!(payment::complete_if_pending(&db, &pid, "TX2", None).await?, 0);
    assert_eq!(payment::close_if_pending(&db, &pid, payment::PaymentStatus::Failed).await?, 0);

    let found = payment::find_by_payment_id(&db, &pid).await?.expect("payment");
    assert_eq!(found.status, payment::PaymentStatus::Completed);
    assert_eq!(found.transaction_id.as_deref(), Some("TX1"));
    Ok(())
}
