use crate::models::Customer;
use crate::utils::validation::non_negative_amount;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::{Validate, ValidationError};

fn valid_prices(prices: &HashMap<String, Decimal>) -> Result<(), ValidationError> {
    prices.values().try_for_each(non_negative_amount)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLogin {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    /// Admins create customers on behalf of a seller.
    pub seller_id: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Business name is required"))]
    pub business_name: String,
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub vat_number: Option<String>,
    #[validate(custom(function = "valid_prices"))]
    pub prices: Option<HashMap<String, Decimal>>,
    #[validate(range(max = 365, message = "Payment terms cannot exceed 365 days"))]
    pub payment_terms_days: Option<u32>,
    #[validate(nested)]
    pub login: Option<CustomerLogin>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, max = 200, message = "Business name is required"))]
    pub business_name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(custom(function = "valid_prices"))]
    pub prices: Option<HashMap<String, Decimal>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 200, message = "Business name cannot be empty"))]
    pub business_name: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub vat_number: Option<String>,
    #[validate(custom(function = "valid_prices"))]
    pub prices: Option<HashMap<String, Decimal>>,
    #[validate(range(max = 365, message = "Payment terms cannot exceed 365 days"))]
    pub payment_terms_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListParams {
    pub seller_id: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: String,
    pub seller_id: String,
    pub business_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub vat_number: Option<String>,
    pub prices: HashMap<String, Decimal>,
    pub parent_customer_id: Option<String>,
    pub has_login: bool,
    pub payment_terms_days: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            seller_id: c.seller_id,
            business_name: c.business_name,
            contact_name: c.contact_name,
            email: c.email,
            phone: c.phone,
            address: c.address,
            vat_number: c.vat_number,
            prices: c.prices,
            parent_customer_id: c.parent_customer_id,
            has_login: c.user_id.is_some(),
            payment_terms_days: c.payment_terms_days,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
