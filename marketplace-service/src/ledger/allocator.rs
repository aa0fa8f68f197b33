use super::round_money;
use crate::models::{Allocation, Order};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("Payment amount must be greater than zero")]
    NonPositivePayment,

    #[error("Allocated amounts ({allocated}) must equal the payment amount ({payment})")]
    SumMismatch { allocated: Decimal, payment: Decimal },

    #[error("Order {0} is not an outstanding order for this customer")]
    UnknownOrder(String),

    #[error("Order {0} appears more than once in the allocation")]
    DuplicateOrder(String),

    #[error("Allocation to order {0} must not be negative")]
    NegativeAmount(String),

    #[error("Allocation of {amount} to order {order_id} exceeds its remaining balance of {remaining}")]
    ExceedsRemaining {
        order_id: String,
        amount: Decimal,
        remaining: Decimal,
    },
}

/// What the allocator needs to know about an order.
#[derive(Debug, Clone)]
pub struct OutstandingBalance {
    pub order_id: String,
    pub created_at: DateTime<Utc>,
    pub remaining: Decimal,
}

impl From<&Order> for OutstandingBalance {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            created_at: order.created_at,
            remaining: order.remaining_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    pub allocations: Vec<Allocation>,
    /// Money left over once every outstanding order is settled.
    pub unallocated: Decimal,
}

impl AllocationPlan {
    pub fn allocated(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    /// Allocations that actually move money.
    pub fn effective(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter().filter(|a| a.amount > Decimal::ZERO)
    }
}

fn oldest_first(outstanding: &[OutstandingBalance]) -> Vec<&OutstandingBalance> {
    let mut sorted: Vec<&OutstandingBalance> = outstanding
        .iter()
        .filter(|o| o.remaining > Decimal::ZERO)
        .collect();
    sorted.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.order_id.cmp(&b.order_id))
    });
    sorted
}

/// Spread a payment across outstanding orders, oldest first, each capped at
/// its remaining balance.
///
/// Every outstanding order gets an entry, including those that receive
/// nothing.
pub fn allocate_oldest_first(
    payment: Decimal,
    outstanding: &[OutstandingBalance],
) -> Result<AllocationPlan, AllocationError> {
    let payment = round_money(payment);
    if payment <= Decimal::ZERO {
        return Err(AllocationError::NonPositivePayment);
    }

    let mut left = payment;
    let allocations = oldest_first(outstanding)
        .into_iter()
        .map(|o| {
            let amount = left.min(o.remaining);
            left -= amount;
            Allocation {
                order_id: o.order_id.clone(),
                amount,
            }
        })
        .collect();

    Ok(AllocationPlan {
        allocations,
        unallocated: left,
    })
}

/// Check a caller-chosen split of a payment.
///
/// The split must account for the whole payment; each order must be
/// outstanding, named once and not overpaid.
pub fn validate_manual(
    payment: Decimal,
    requested: &[Allocation],
    outstanding: &[OutstandingBalance],
) -> Result<AllocationPlan, AllocationError> {
    let payment = round_money(payment);
    if payment <= Decimal::ZERO {
        return Err(AllocationError::NonPositivePayment);
    }

    let remaining: HashMap<&str, Decimal> = outstanding
        .iter()
        .filter(|o| o.remaining > Decimal::ZERO)
        .map(|o| (o.order_id.as_str(), o.remaining))
        .collect();

    let mut seen = HashSet::new();
    let mut allocations = Vec::with_capacity(requested.len());
    for req in requested {
        let amount = round_money(req.amount);
        let Some(&left) = remaining.get(req.order_id.as_str()) else {
            return Err(AllocationError::UnknownOrder(req.order_id.clone()));
        };
        if !seen.insert(req.order_id.as_str()) {
            return Err(AllocationError::DuplicateOrder(req.order_id.clone()));
        }
        if amount < Decimal::ZERO {
            return Err(AllocationError::NegativeAmount(req.order_id.clone()));
        }
        if amount > left {
            return Err(AllocationError::ExceedsRemaining {
                order_id: req.order_id.clone(),
                amount,
                remaining: left,
            });
        }
        allocations.push(Allocation {
            order_id: req.order_id.clone(),
            amount,
        });
    }

    let allocated: Decimal = allocations.iter().map(|a| a.amount).sum();
    if allocated != payment {
        return Err(AllocationError::SumMismatch { allocated, payment });
    }

    Ok(AllocationPlan {
        allocations,
        unallocated: Decimal::ZERO,
    })
}
