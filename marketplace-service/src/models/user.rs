use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login account. A seller's `seller_id` is its own id; a customer login
/// carries both its customer record and the seller that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub seller_id: Option<String>,
    pub customer_id: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new_seller(email: String, name: Option<String>, password_hash: String) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            seller_id: Some(id.clone()),
            id,
            email: email.to_lowercase(),
            name,
            password_hash,
            role: Role::Seller,
            customer_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn new_customer(
        email: String,
        password_hash: String,
        seller_id: String,
        customer_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_lowercase(),
            name: None,
            password_hash,
            role: Role::Customer,
            seller_id: Some(seller_id),
            customer_id: Some(customer_id),
            created_at: Utc::now(),
        }
    }

    pub fn new_admin(email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_lowercase(),
            name: Some("Administrator".to_string()),
            password_hash,
            role: Role::Admin,
            seller_id: None,
            customer_id: None,
            created_at: Utc::now(),
        }
    }
}
