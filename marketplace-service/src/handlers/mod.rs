pub mod auth;
pub mod customers;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reports;
pub mod statements;
pub mod transactions;

use crate::ledger::{AllocationError, CreditNoteError, LedgerError};
use crate::models::{Customer, Order, Product, Role, Transaction};
use crate::policy::{Principal, Resource};
use crate::startup::AppState;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use service_core::error::AppError;

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvariantViolated { .. } => AppError::InternalError(anyhow::Error::new(err)),
            other => AppError::bad_request(other),
        }
    }
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        AppError::bad_request(err)
    }
}

impl From<CreditNoteError> for AppError {
    fn from(err: CreditNoteError) -> Self {
        match err {
            CreditNoteError::Ledger(inner) => inner.into(),
            other => AppError::bad_request(other),
        }
    }
}

pub(crate) async fn load_customer(state: &AppState, id: &str) -> Result<Customer, AppError> {
    state
        .store
        .get_customer(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Customer {} not found", id)))
}

pub(crate) async fn load_product(state: &AppState, id: &str) -> Result<Product, AppError> {
    state
        .store
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", id)))
}

pub(crate) async fn load_order(state: &AppState, id: &str) -> Result<Order, AppError> {
    state
        .store
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", id)))
}

pub(crate) async fn load_transaction(state: &AppState, id: &str) -> Result<Transaction, AppError> {
    state
        .store
        .get_transaction(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Transaction {} not found", id)))
}

pub(crate) fn customer_resource(customer: &Customer) -> Resource<'_> {
    Resource::Customer {
        seller_id: &customer.seller_id,
        customer_id: &customer.id,
        parent_customer_id: customer.parent_customer_id.as_deref(),
    }
}

pub(crate) fn order_resource(order: &Order) -> Resource<'_> {
    Resource::Order {
        seller_id: &order.seller_id,
        customer_id: &order.customer_id,
    }
}

pub(crate) fn transaction_resource(transaction: &Transaction) -> Resource<'_> {
    Resource::Transaction {
        seller_id: &transaction.seller_id,
        customer_id: &transaction.customer_id,
    }
}

/// The seller a write lands on: sellers always use their own tenant, admins
/// must name one.
pub(crate) fn target_seller(principal: &Principal, requested: Option<String>) -> Result<String, AppError> {
    match principal.role {
        Role::Admin => requested.ok_or_else(|| AppError::bad_request("sellerId is required")),
        Role::Seller => principal
            .seller_id
            .clone()
            .ok_or_else(|| AppError::forbidden("Seller account is not set up")),
        Role::Customer => Err(AppError::forbidden("Your role cannot perform this action")),
    }
}

/// The customer a customer principal acts as.
pub(crate) fn own_customer_id(principal: &Principal) -> Result<&str, AppError> {
    principal
        .customer_id
        .as_deref()
        .ok_or_else(|| AppError::forbidden("No customer account is linked to this login"))
}

/// Customers may only name themselves; others must name a customer.
pub(crate) fn scoped_customer_id(
    principal: &Principal,
    requested: Option<String>,
) -> Result<String, AppError> {
    match principal.role {
        Role::Customer => {
            let own = own_customer_id(principal)?;
            match requested {
                Some(id) if id != own => Err(AppError::forbidden(
                    "You do not have access to this resource",
                )),
                _ => Ok(own.to_string()),
            }
        }
        _ => requested.ok_or_else(|| AppError::bad_request("customerId is required")),
    }
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub(crate) fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + chrono::Duration::days(1) - chrono::Duration::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use rust_decimal::Decimal;

    #[test]
    fn ledger_errors_map_to_client_errors() {
        let err: AppError = LedgerError::Overpayment {
            order_id: "o-1".into(),
            amount: Decimal::from(70),
            remaining: Decimal::from(60),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: AppError = CreditNoteError::Ledger(LedgerError::InvariantViolated {
            order_id: "o-1".into(),
            detail: "drift".into(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(start_of_day(day).to_rfc3339(), "2024-03-31T00:00:00+00:00");
        assert_eq!(end_of_day(day).to_rfc3339(), "2024-03-31T23:59:59.999+00:00");
    }
}
