//! Customer ledger reconciliation.
//!
//! Everything in here is pure: it mutates in-memory [`Order`](crate::models::Order)
//! values and builds documents, and leaves persistence to the caller, which
//! commits the affected orders and transaction in one
//! [`LedgerCommit`](crate::services::store::LedgerCommit).

pub mod allocator;
pub mod credit_note;
pub mod csv_export;
pub mod order_ledger;
pub mod statement;

pub use allocator::{AllocationError, AllocationPlan, OutstandingBalance};
pub use credit_note::{CreditNoteError, CreditNoteRequest};
pub use order_ledger::LedgerError;
pub use statement::{Period, Statement, StatementBuilder, StatementLine, StatementLineKind};

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to cents, half away from zero, always carrying
/// two decimal places.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
