use super::round_money;
use crate::models::{Order, OrderStatus, PaymentRecord, PaymentStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Payment amount must be greater than zero")]
    NonPositivePayment,

    #[error("Payment of {amount} exceeds the remaining balance of {remaining} on order {order_id}")]
    Overpayment {
        order_id: String,
        amount: Decimal,
        remaining: Decimal,
    },

    #[error("Order {0} is cancelled")]
    OrderCancelled(String),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("Order {0} has payments or credit notes; delete them before cancelling")]
    CancelWithLedgerEntries(String),

    #[error("Order {order_id} has no entry for transaction {transaction_id}")]
    UnknownEntry {
        order_id: String,
        transaction_id: String,
    },

    #[error("Ledger invariant violated on order {order_id}: {detail}")]
    InvariantViolated { order_id: String, detail: String },
}

/// Payment status from the current balance.
///
/// Anything at or below zero remaining is paid; an unpaid balance past its
/// due date is overdue.
pub fn derive_payment_status(
    total: Decimal,
    total_paid: Decimal,
    due_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> PaymentStatus {
    let remaining = total - total_paid;
    if remaining <= Decimal::ZERO {
        PaymentStatus::Paid
    } else if due_date.is_some_and(|due| due < now) {
        PaymentStatus::Overdue
    } else if total_paid > Decimal::ZERO && total_paid < total {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}

/// Payment status of a stored order as seen at `now`.
///
/// The stored field is only refreshed on writes, so an untouched order can
/// fall past its due date without it changing.
pub fn payment_status_at(order: &Order, now: DateTime<Utc>) -> PaymentStatus {
    derive_payment_status(order.total, order.total_paid, order.due_date, now)
}

/// Recompute the derived balance fields after `total` or `total_paid` moved.
pub fn recompute(order: &mut Order, now: DateTime<Utc>) {
    order.total = round_money(order.total);
    order.total_paid = round_money(order.total_paid);
    order.remaining_amount = round_money(order.total - order.total_paid);
    order.payment_status = derive_payment_status(order.total, order.total_paid, order.due_date, now);
    order.updated_at = now;
}

pub fn check_invariants(order: &Order) -> Result<(), LedgerError> {
    if order.remaining_amount != round_money(order.total - order.total_paid) {
        return Err(LedgerError::InvariantViolated {
            order_id: order.id.clone(),
            detail: format!(
                "remaining {} != total {} - paid {}",
                order.remaining_amount, order.total, order.total_paid
            ),
        });
    }

    let paid: Decimal = order.payments.iter().map(|p| p.amount).sum();
    if round_money(paid) != order.total_paid {
        return Err(LedgerError::InvariantViolated {
            order_id: order.id.clone(),
            detail: format!("payments sum {} != paid {}", paid, order.total_paid),
        });
    }

    if let Some(original) = order.original_total {
        let expected = round_money(original - order.credited_total());
        if expected != order.total {
            return Err(LedgerError::InvariantViolated {
                order_id: order.id.clone(),
                detail: format!(
                    "total {} != original {} - credits {}",
                    order.total,
                    original,
                    order.credited_total()
                ),
            });
        }
    }

    Ok(())
}

/// Apply one payment to an order.
///
/// The order is left untouched on error.
pub fn apply_payment(
    order: &mut Order,
    payment: PaymentRecord,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    let amount = round_money(payment.amount);
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositivePayment);
    }
    if order.status == OrderStatus::Cancelled {
        return Err(LedgerError::OrderCancelled(order.id.clone()));
    }
    if amount > order.remaining_amount {
        return Err(LedgerError::Overpayment {
            order_id: order.id.clone(),
            amount,
            remaining: order.remaining_amount,
        });
    }

    order.total_paid += amount;
    order.payments.push(PaymentRecord { amount, ..payment });
    recompute(order, now);
    check_invariants(order)
}

/// Remove every payment record `transaction_id` left on the order.
///
/// Returns the amount taken back off `total_paid`.
pub fn reverse_payment(
    order: &mut Order,
    transaction_id: &str,
    now: DateTime<Utc>,
) -> Result<Decimal, LedgerError> {
    let reversed: Decimal = order
        .payments
        .iter()
        .filter(|p| p.transaction_id == transaction_id)
        .map(|p| p.amount)
        .sum();

    if !order.payments.iter().any(|p| p.transaction_id == transaction_id) {
        return Err(LedgerError::UnknownEntry {
            order_id: order.id.clone(),
            transaction_id: transaction_id.to_string(),
        });
    }

    order.payments.retain(|p| p.transaction_id != transaction_id);
    order.total_paid -= reversed;
    recompute(order, now);
    check_invariants(order)?;
    Ok(reversed)
}

pub fn transition_status(
    order: &mut Order,
    next: OrderStatus,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    if !order.status.can_transition_to(next) {
        return Err(LedgerError::InvalidTransition {
            from: order.status.as_str(),
            to: next.as_str(),
        });
    }
    if next == OrderStatus::Cancelled
        && (!order.payments.is_empty() || !order.credit_notes.is_empty())
    {
        return Err(LedgerError::CancelWithLedgerEntries(order.id.clone()));
    }
    order.status = next;
    order.updated_at = now;
    Ok(())
}

/// An order still owing money that payments can be allocated to.
pub fn is_outstanding(order: &Order) -> bool {
    order.status != OrderStatus::Cancelled && order.remaining_amount > Decimal::ZERO
}
