use sea_orm::{entity::prelude::*, sea_query::Expr, ConnectionTrait, QueryFilter, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[sea_orm(string_value = "order")]
    Order,
    #[sea_orm(string_value = "wallet_topup")]
    WalletTopup,
    #[sea_orm(string_value = "reseller_registration")]
    ResellerRegistration,
}

/// Lifecycle: `pending` moves once to one of the terminal states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Gateway-issued handle, shared with the client.
    pub payment_id: String,
    pub payment_type: PaymentType,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub transaction_id: Option<String>,
    pub hosted_url: String,
    /// Account produced by a completed registration.
    pub user_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}

pub struct NewPayment {
    pub id: Uuid,
    pub payment_id: String,
    pub payment_type: PaymentType,
    pub amount: i64,
    pub currency: String,
    pub metadata: Json,
    pub hosted_url: String,
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewPayment) -> Result<Model, ModelError> {
    if new.payment_id.trim().is_empty() { return Err(ModelError::Validation("payment id required".into())); }
    if new.amount <= 0 { return Err(ModelError::Validation("amount must be positive".into())); }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(new.id),
        payment_id: Set(new.payment_id),
        payment_type: Set(new.payment_type),
        amount: Set(new.amount),
        currency: Set(new.currency),
        status: Set(PaymentStatus::Pending),
        metadata: Set(new.metadata),
        transaction_id: Set(None),
        hosted_url: Set(new.hosted_url),
        user_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(ModelError::from_db)
}

pub async fn find_by_payment_id<C: ConnectionTrait>(db: &C, payment_id: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::PaymentId.eq(payment_id))
        .one(db)
        .await
        .map_err(ModelError::from_db)
}

/// `pending -> completed`, guarded on the current status. Returns rows changed (0 or 1).
pub async fn complete_if_pending<C: ConnectionTrait>(
    db: &C,
    payment_id: &str,
    transaction_id: &str,
    user_id: Option<Uuid>,
) -> Result<u64, ModelError> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let res = Entity::update_many()
        .col_expr(Column::Status, Expr::value(PaymentStatus::Completed.as_str()))
        .col_expr(Column::TransactionId, Expr::value(Some(transaction_id.to_string())))
        .col_expr(Column::UserId, Expr::value(user_id))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::PaymentId.eq(payment_id))
        .filter(Column::Status.eq(PaymentStatus::Pending))
        .exec(db)
        .await
        .map_err(ModelError::from_db)?;
    Ok(res.rows_affected)
}

/// `pending -> failed | cancelled`, guarded on the current status.
pub async fn close_if_pending<C: ConnectionTrait>(
    db: &C,
    payment_id: &str,
    status: PaymentStatus,
) -> Result<u64, ModelError> {
    if !matches!(status, PaymentStatus::Failed | PaymentStatus::Cancelled) {
        return Err(ModelError::Validation(format!("cannot close payment as {}", status.as_str())));
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    let res = Entity::update_many()
        .col_expr(Column::Status, Expr::value(status.as_str()))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::PaymentId.eq(payment_id))
        .filter(Column::Status.eq(PaymentStatus::Pending))
        .exec(db)
        .await
        .map_err(ModelError::from_db)?;
    Ok(res.rows_affected)
}
