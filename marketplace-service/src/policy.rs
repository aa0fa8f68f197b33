//! Role and ownership rules, kept apart from HTTP so they can be checked
//! directly.

use crate::models::{Role, User};
use service_core::error::AppError;

/// The authenticated caller, built once per request by the session layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub seller_id: Option<String>,
    pub customer_id: Option<String>,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            seller_id: user.seller_id.clone(),
            customer_id: user.customer_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

/// Something a principal wants to touch, reduced to its ownership keys.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Customer {
        seller_id: &'a str,
        customer_id: &'a str,
        parent_customer_id: Option<&'a str>,
    },
    Product {
        seller_id: &'a str,
    },
    Order {
        seller_id: &'a str,
        customer_id: &'a str,
    },
    Transaction {
        seller_id: &'a str,
        customer_id: &'a str,
    },
    Conversation {
        seller_id: &'a str,
        customer_id: &'a str,
    },
    SalesReport {
        seller_id: &'a str,
    },
}

impl Resource<'_> {
    fn seller_id(&self) -> &str {
        match self {
            Resource::Customer { seller_id, .. }
            | Resource::Product { seller_id }
            | Resource::Order { seller_id, .. }
            | Resource::Transaction { seller_id, .. }
            | Resource::Conversation { seller_id, .. }
            | Resource::SalesReport { seller_id } => seller_id,
        }
    }
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Seller whose data this principal works within. `None` for admins.
    pub fn seller_scope(&self) -> Option<&str> {
        match self.role {
            Role::Admin => None,
            _ => self.seller_id.as_deref(),
        }
    }

    fn owns_customer(&self, customer_id: &str) -> bool {
        self.customer_id.as_deref() == Some(customer_id)
    }

    pub fn require(&self, resource: Resource<'_>, action: Action) -> Result<(), AppError> {
        if can_access(self, resource, action) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                role = %self.role,
                ?action,
                "Access denied"
            );
            Err(AppError::forbidden("You do not have access to this resource"))
        }
    }

    pub fn require_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::forbidden("Your role cannot perform this action"))
        }
    }
}

pub fn can_access(principal: &Principal, resource: Resource<'_>, action: Action) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Seller => principal.seller_id.as_deref() == Some(resource.seller_id()),
        Role::Customer => {
            if principal.seller_id.as_deref() != Some(resource.seller_id()) {
                return false;
            }
            match (resource, action) {
                (_, Action::Delete) => false,
                (
                    Resource::Customer {
                        customer_id,
                        parent_customer_id,
                        ..
                    },
                    Action::Read,
                ) => {
                    principal.owns_customer(customer_id)
                        || parent_customer_id.is_some_and(|p| principal.owns_customer(p))
                }
                (Resource::Product { .. }, Action::Read) => true,
                (Resource::Order { customer_id, .. }, Action::Read | Action::Create | Action::Update) => {
                    principal.owns_customer(customer_id)
                }
                (Resource::Transaction { customer_id, .. }, Action::Read) => {
                    principal.owns_customer(customer_id)
                }
                (Resource::Conversation { customer_id, .. }, Action::Read | Action::Create) => {
                    principal.owns_customer(customer_id)
                }
                _ => false,
            }
        }
    }
}
