use sea_orm::{entity::prelude::*, ConnectionTrait, QueryFilter, QuerySelect, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::store;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "reseller")]
    Reseller,
    #[sea_orm(string_value = "customer")]
    Customer,
}

/// Approval state shared by resellers and their stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "suspended")]
    Suspended,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub business_name: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub wallet_balance: i64,
    pub wallet_currency: String,
    pub total_orders: i64,
    pub total_revenue: i64,
    pub total_profit: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Store,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Store => Entity::has_one(store::Entity).into() }
    }
}

impl Related<store::Entity> for Entity {
    fn to() -> RelationDef { Relation::Store.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields of a reseller account created from a confirmed registration.
#[derive(Clone, Debug)]
pub struct NewReseller {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub business_name: String,
    pub wallet_currency: String,
}

/// Trim and lowercase; emails are unique case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ModelError::Validation("invalid email".into()));
    };
    if local.is_empty() || domain.is_empty() || domain.starts_with('.') || domain.ends_with('.') || email.len() > 255 {
        return Err(ModelError::Validation("invalid email".into()));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    let name = name.trim();
    if name.is_empty() { return Err(ModelError::Validation("name required".into())); }
    if name.chars().count() > 128 { return Err(ModelError::Validation("name too long".into())); }
    Ok(())
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(ModelError::from_db)
}

pub async fn email_exists<C: ConnectionTrait>(db: &C, email: &str) -> Result<bool, ModelError> {
    Ok(find_by_email(db, email).await?.is_some())
}

/// Ids of every admin account, used for registration fan-out.
pub async fn admin_ids<C: ConnectionTrait>(db: &C) -> Result<Vec<Uuid>, ModelError> {
    Entity::find()
        .select_only()
        .column(Column::Id)
        .filter(Column::Role.eq(Role::Admin))
        .into_tuple::<Uuid>()
        .all(db)
        .await
        .map_err(ModelError::from_db)
}

/// Insert a reseller in `pending` status with an empty wallet and zeroed statistics.
pub async fn create_reseller<C: ConnectionTrait>(db: &C, new: NewReseller) -> Result<Model, ModelError> {
    validate_email(&new.email)?;
    validate_name(&new.name)?;
    if new.password_hash.trim().is_empty() {
        return Err(ModelError::Validation("password hash required".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(new.id),
        email: Set(normalize_email(&new.email)),
        password_hash: Set(new.password_hash),
        name: Set(new.name.trim().to_string()),
        business_name: Set(Some(new.business_name.trim().to_string())),
        role: Set(Role::Reseller),
        status: Set(AccountStatus::Pending),
        wallet_balance: Set(0),
        wallet_currency: Set(new.wallet_currency),
        total_orders: Set(0),
        total_revenue: Set(0),
        total_profit: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(ModelError::from_db)
}
