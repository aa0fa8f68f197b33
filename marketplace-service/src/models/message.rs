use super::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat message. There is one conversation per customer, keyed by
/// `customer_id`, between that customer and its seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer_id: String,
    pub seller_id: String,
    pub sender_id: String,
    pub sender_role: Role,
    pub body: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
