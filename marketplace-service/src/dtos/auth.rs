use crate::models::Role;
use crate::policy::Principal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub seller_id: Option<String>,
    pub customer_id: Option<String>,
}

impl From<Principal> for SessionResponse {
    fn from(p: Principal) -> Self {
        Self {
            user_id: p.user_id,
            email: p.email,
            role: p.role,
            seller_id: p.seller_id,
            customer_id: p.customer_id,
        }
    }
}
