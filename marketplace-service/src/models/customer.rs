use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Buyer account owned by a seller.
///
/// Branches are shadow customer records pointing at their parent through
/// `parent_customer_id`; they inherit the parent's price map for products
/// they have no price of their own for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: String,
    pub seller_id: String,
    pub business_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub vat_number: Option<String>,
    #[serde(default)]
    pub prices: HashMap<String, Decimal>,
    pub parent_customer_id: Option<String>,
    pub user_id: Option<String>,
    pub payment_terms_days: Option<u32>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn is_branch(&self) -> bool {
        self.parent_customer_id.is_some()
    }
}
