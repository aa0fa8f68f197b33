use crate::models::Product;
use crate::utils::validation::non_negative_amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub seller_id: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    #[validate(custom(function = "non_negative_amount"))]
    pub price: Decimal,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name cannot be empty"))]
    pub name: Option<String>,
    pub sku: Option<String>,
    pub unit: Option<String>,
    #[validate(custom(function = "non_negative_amount"))]
    pub price: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    /// Price for the caller: the customer's own price when one applies.
    pub price: Decimal,
    pub list_price: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponse {
    pub fn priced(product: Product, price: Decimal) -> Self {
        Self {
            id: product.id,
            seller_id: product.seller_id,
            name: product.name,
            sku: product.sku,
            unit: product.unit,
            price,
            list_price: product.price,
            active: product.active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        let price = product.price;
        Self::priced(product, price)
    }
}
