use sea_orm::{entity::prelude::*, ConnectionTrait, QueryFilter, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user::{self, AccountStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "store")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub custom_domain_verified: bool,
    pub primary_color: String,
    pub accent_color: String,
    pub background_color: String,
    pub default_markup: i32,
    pub minimum_markup: i32,
    pub maximum_markup: i32,
    pub auto_fulfillment: bool,
    pub low_balance_alert: i64,
    pub status: AccountStatus,
    pub total_orders: i64,
    pub total_revenue: i64,
    pub total_profit: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Reseller,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Reseller => Entity::belongs_to(user::Entity)
                .from(Column::ResellerId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::Reseller.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Verified custom domain wins over the platform subdomain.
    pub fn full_domain(&self, base_domain: &str) -> String {
        match (&self.custom_domain, self.custom_domain_verified) {
            (Some(domain), true) => domain.clone(),
            _ => format!("{}.{}", self.subdomain, base_domain),
        }
    }

    pub fn pricing(&self) -> PricingPolicy {
        PricingPolicy {
            default_markup: self.default_markup,
            minimum_markup: self.minimum_markup,
            maximum_markup: self.maximum_markup,
        }
    }
}

/// Markup percentages a reseller applies on top of catalog prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub default_markup: i32,
    pub minimum_markup: i32,
    pub maximum_markup: i32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self { default_markup: 20, minimum_markup: 10, maximum_markup: 50 }
    }
}

impl PricingPolicy {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.minimum_markup < 0 || self.default_markup < 0 || self.maximum_markup < 0 {
            return Err(ModelError::Validation("markups must be non-negative".into()));
        }
        if !(self.minimum_markup <= self.default_markup && self.default_markup <= self.maximum_markup) {
            return Err(ModelError::Validation("markups must satisfy minimum <= default <= maximum".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub primary_color: String,
    pub accent_color: String,
    pub background_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#6366f1".into(),
            accent_color: "#4f46e5".into(),
            background_color: "#000000".into(),
        }
    }
}

/// Fields of the tenant store created alongside its reseller.
#[derive(Clone, Debug)]
pub struct NewStore {
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub theme: Theme,
    pub pricing: PricingPolicy,
    pub auto_fulfillment: bool,
    pub low_balance_alert: i64,
}

impl NewStore {
    pub fn with_defaults(reseller_id: Uuid, name: &str, subdomain: &str, custom_domain: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reseller_id,
            name: name.trim().to_string(),
            subdomain: subdomain.to_string(),
            custom_domain,
            theme: Theme::default(),
            pricing: PricingPolicy::default(),
            auto_fulfillment: true,
            low_balance_alert: 100,
        }
    }
}

/// `[a-z0-9-]+`, no leading or trailing hyphen, at most 63 chars.
pub fn validate_subdomain(subdomain: &str) -> Result<(), ModelError> {
    let ok = !subdomain.is_empty()
        && subdomain.len() <= 63
        && !subdomain.starts_with('-')
        && !subdomain.ends_with('-')
        && subdomain.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if ok { Ok(()) } else { Err(ModelError::Validation(format!("invalid subdomain: {subdomain}"))) }
}

pub async fn subdomain_exists<C: ConnectionTrait>(db: &C, subdomain: &str) -> Result<bool, ModelError> {
    let found = Entity::find()
        .filter(Column::Subdomain.eq(subdomain))
        .one(db)
        .await
        .map_err(ModelError::from_db)?;
    Ok(found.is_some())
}

pub async fn custom_domain_exists<C: ConnectionTrait>(db: &C, domain: &str) -> Result<bool, ModelError> {
    let found = Entity::find()
        .filter(Column::CustomDomain.eq(domain))
        .one(db)
        .await
        .map_err(ModelError::from_db)?;
    Ok(found.is_some())
}

pub async fn find_by_reseller<C: ConnectionTrait>(db: &C, reseller_id: Uuid) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::ResellerId.eq(reseller_id))
        .one(db)
        .await
        .map_err(ModelError::from_db)
}

/// Insert a store in `pending` status with zeroed analytics.
pub async fn create<C: ConnectionTrait>(db: &C, new: NewStore) -> Result<Model, ModelError> {
    validate_subdomain(&new.subdomain)?;
    new.pricing.validate()?;
    if new.name.is_empty() { return Err(ModelError::Validation("store name required".into())); }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(new.id),
        reseller_id: Set(new.reseller_id),
        name: Set(new.name),
        description: Set(None),
        logo: Set(None),
        subdomain: Set(new.subdomain),
        custom_domain: Set(new.custom_domain),
        custom_domain_verified: Set(false),
        primary_color: Set(new.theme.primary_color),
        accent_color: Set(new.theme.accent_color),
        background_color: Set(new.theme.background_color),
        default_markup: Set(new.pricing.default_markup),
        minimum_markup: Set(new.pricing.minimum_markup),
        maximum_markup: Set(new.pricing.maximum_markup),
        auto_fulfillment: Set(new.auto_fulfillment),
        low_balance_alert: Set(new.low_balance_alert),
        status: Set(AccountStatus::Pending),
        total_orders: Set(0),
        total_revenue: Set(0),
        total_profit: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(ModelError::from_db)
}
