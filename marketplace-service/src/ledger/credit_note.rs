use super::order_ledger::{check_invariants, recompute, LedgerError};
use super::round_money;
use crate::models::{
    CreditNoteReason, CreditNoteRecord, Order, OrderStatus, Transaction, TransactionKind,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Label for credit notes whose reason cannot be determined.
pub const UNTAGGED_LABEL: &str = "Credit Note";

#[derive(Debug, Error, PartialEq)]
pub enum CreditNoteError {
    #[error("Credit note amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Credit note amount {amount} exceeds the order total {total}")]
    ExceedsTotal { amount: Decimal, total: Decimal },

    #[error("Credit note notes are required")]
    MissingNotes,

    #[error("Order {0} is cancelled")]
    OrderCancelled(String),

    #[error("Order {order_id} has no credit note for transaction {transaction_id}")]
    UnknownCreditNote {
        order_id: String,
        transaction_id: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone)]
pub struct CreditNoteRequest {
    pub amount: Decimal,
    pub reason: CreditNoteReason,
    pub notes: String,
    pub created_by: String,
}

/// Reduce an order's total by a credit note.
///
/// Validation happens before anything is touched, so a rejected request
/// leaves the order as it was.
pub fn apply_credit_note(
    order: &mut Order,
    transaction_id: &str,
    request: &CreditNoteRequest,
    now: DateTime<Utc>,
) -> Result<CreditNoteRecord, CreditNoteError> {
    let amount = round_money(request.amount);
    if amount <= Decimal::ZERO {
        return Err(CreditNoteError::NonPositiveAmount);
    }
    if amount > order.total {
        return Err(CreditNoteError::ExceedsTotal {
            amount,
            total: order.total,
        });
    }
    let notes = request.notes.trim();
    if notes.is_empty() {
        return Err(CreditNoteError::MissingNotes);
    }
    if order.status == OrderStatus::Cancelled {
        return Err(CreditNoteError::OrderCancelled(order.id.clone()));
    }

    if order.original_total.is_none() {
        order.original_total = Some(order.total);
    }
    order.total -= amount;

    let record = CreditNoteRecord {
        transaction_id: transaction_id.to_string(),
        amount,
        reason: request.reason,
        notes: notes.to_string(),
        created_by: request.created_by.clone(),
        created_at: now,
    };
    order.credit_notes.push(record.clone());

    recompute(order, now);
    check_invariants(order)?;
    Ok(record)
}

/// The transaction mirroring a credit note. Its amount is negative.
pub fn mirror_transaction(order: &Order, record: &CreditNoteRecord) -> Transaction {
    Transaction {
        id: record.transaction_id.clone(),
        customer_id: order.customer_id.clone(),
        seller_id: order.seller_id.clone(),
        kind: TransactionKind::CreditNote,
        amount: -record.amount,
        payment_method: None,
        reference: None,
        related_order_id: Some(order.id.clone()),
        allocations: vec![],
        unallocated_amount: Decimal::ZERO,
        credit_reason: Some(record.reason),
        notes: Some(record.notes.clone()),
        created_by: record.created_by.clone(),
        transaction_date: record.created_at,
        created_at: record.created_at,
    }
}

/// Undo a credit note: its amount goes back onto the order total.
pub fn reverse_credit_note(
    order: &mut Order,
    transaction_id: &str,
    now: DateTime<Utc>,
) -> Result<Decimal, CreditNoteError> {
    let Some(pos) = order
        .credit_notes
        .iter()
        .position(|c| c.transaction_id == transaction_id)
    else {
        return Err(CreditNoteError::UnknownCreditNote {
            order_id: order.id.clone(),
            transaction_id: transaction_id.to_string(),
        });
    };

    let record = order.credit_notes.remove(pos);
    order.total += record.amount;
    if order.credit_notes.is_empty() {
        order.original_total = None;
    }
    recompute(order, now);
    check_invariants(order)?;
    Ok(record.amount)
}

const REASON_KEYWORDS: [(CreditNoteReason, &[&str]); 6] = [
    (CreditNoteReason::ReturnedGoods, &["return", "returned"]),
    (CreditNoteReason::QualityIssue, &["quality"]),
    (CreditNoteReason::WrongItems, &["wrong"]),
    (CreditNoteReason::DamagedGoods, &["damage", "broken"]),
    (CreditNoteReason::PricingError, &["price", "pricing"]),
    (CreditNoteReason::CustomerComplaint, &["complaint"]),
];

/// Best-effort reason for credit notes recorded without a tag.
///
/// Notes that hit keywords from more than one category stay untagged.
pub fn infer_reason(notes: &str) -> Option<CreditNoteReason> {
    let notes = notes.to_lowercase();
    let mut matches = REASON_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| notes.contains(w)))
        .map(|(reason, _)| *reason);
    match (matches.next(), matches.next()) {
        (Some(reason), None) => Some(reason),
        _ => None,
    }
}

/// Human label for a credit note transaction.
pub fn reason_label(transaction: &Transaction) -> &'static str {
    transaction
        .credit_reason
        .or_else(|| transaction.notes.as_deref().and_then(infer_reason))
        .map(|r| r.label())
        .unwrap_or(UNTAGGED_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::{at, order};
    use crate::ledger::order_ledger::apply_payment;
    use crate::models::{PaymentMethod, PaymentRecord, PaymentStatus};

    fn request(amount: i64, notes: &str) -> CreditNoteRequest {
        CreditNoteRequest {
            amount: Decimal::from(amount),
            reason: CreditNoteReason::DamagedGoods,
            notes: notes.to_string(),
            created_by: "seller-1".to_string(),
        }
    }

    #[test]
    fn credit_note_reduces_total_and_keeps_original() {
        let mut o = order("o-1", 100, at(2026, 2, 1));
        let record =
            apply_credit_note(&mut o, "cn-1", &request(30, "two crates arrived crushed"), at(2026, 2, 3))
                .unwrap();

        assert_eq!(o.total, Decimal::from(70));
        assert_eq!(o.original_total, Some(Decimal::from(100)));
        assert_eq!(o.remaining_amount, Decimal::from(70));
        assert_eq!(record.reason, CreditNoteReason::DamagedGoods);

        let tx = mirror_transaction(&o, &record);
        assert_eq!(tx.amount, Decimal::from(-30));
        assert_eq!(tx.kind, TransactionKind::CreditNote);
        assert_eq!(tx.related_order_id.as_deref(), Some("o-1"));
    }

    #[test]
    fn second_credit_note_keeps_first_original_total() {
        let mut o = order("o-1", 100, at(2026, 2, 1));
        apply_credit_note(&mut o, "cn-1", &request(30, "damaged"), at(2026, 2, 3)).unwrap();
        apply_credit_note(&mut o, "cn-2", &request(20, "damaged"), at(2026, 2, 4)).unwrap();
        assert_eq!(o.total, Decimal::from(50));
        assert_eq!(o.original_total, Some(Decimal::from(100)));
    }

    #[test]
    fn credit_above_total_is_rejected_without_mutation() {
        let mut o = order("o-1", 100, at(2026, 2, 1));
        let err = apply_credit_note(&mut o, "cn-1", &request(101, "too much"), at(2026, 2, 3))
            .unwrap_err();
        assert!(matches!(err, CreditNoteError::ExceedsTotal { .. }));
        assert_eq!(o.total, Decimal::from(100));
        assert_eq!(o.original_total, None);
        assert!(o.credit_notes.is_empty());
    }

    #[test]
    fn notes_are_required() {
        let mut o = order("o-1", 100, at(2026, 2, 1));
        assert_eq!(
            apply_credit_note(&mut o, "cn-1", &request(10, "   "), at(2026, 2, 3)),
            Err(CreditNoteError::MissingNotes)
        );
    }

    #[test]
    fn credit_after_payment_can_settle_order() {
        let now = at(2026, 2, 3);
        let mut o = order("o-1", 100, at(2026, 2, 1));
        apply_payment(
            &mut o,
            PaymentRecord {
                transaction_id: "t-1".into(),
                amount: Decimal::from(70),
                method: PaymentMethod::Cash,
                reference: None,
                paid_at: now,
            },
            now,
        )
        .unwrap();
        apply_credit_note(&mut o, "cn-1", &request(30, "damaged"), now).unwrap();
        assert_eq!(o.remaining_amount, Decimal::ZERO);
        assert_eq!(o.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn reversal_restores_total() {
        let now = at(2026, 2, 3);
        let mut o = order("o-1", 100, at(2026, 2, 1));
        apply_credit_note(&mut o, "cn-1", &request(30, "damaged"), now).unwrap();

        let restored = reverse_credit_note(&mut o, "cn-1", now).unwrap();
        assert_eq!(restored, Decimal::from(30));
        assert_eq!(o.total, Decimal::from(100));
        assert_eq!(o.original_total, None);
    }

    #[test]
    fn legacy_reason_inference() {
        assert_eq!(infer_reason("Customer returned 3 boxes"), Some(CreditNoteReason::ReturnedGoods));
        assert_eq!(infer_reason("Broken bottles"), Some(CreditNoteReason::DamagedGoods));
        assert_eq!(infer_reason("Sent the wrong flavour"), Some(CreditNoteReason::WrongItems));
        assert_eq!(infer_reason("goodwill gesture"), None);
    }

    #[test]
    fn notes_matching_several_reasons_stay_untagged() {
        assert_eq!(infer_reason("Wrong price charged"), None);
        assert_eq!(infer_reason("Returned, box was broken"), None);

        let mut o = order("o-1", 100, at(2026, 2, 1));
        let record =
            apply_credit_note(&mut o, "cn-1", &request(10, "wrong price"), at(2026, 2, 3)).unwrap();
        let mut tx = mirror_transaction(&o, &record);
        tx.credit_reason = None;
        assert_eq!(reason_label(&tx), UNTAGGED_LABEL);
    }

    #[test]
    fn label_prefers_stored_tag() {
        let mut o = order("o-1", 100, at(2026, 2, 1));
        let record = apply_credit_note(
            &mut o,
            "cn-1",
            &CreditNoteRequest {
                reason: CreditNoteReason::PricingError,
                ..request(10, "returned items")
            },
            at(2026, 2, 3),
        )
        .unwrap();
        let mut tx = mirror_transaction(&o, &record);
        assert_eq!(reason_label(&tx), "Pricing Error");

        tx.credit_reason = None;
        assert_eq!(reason_label(&tx), "Returned Goods");

        tx.notes = Some("adjustment".into());
        assert_eq!(reason_label(&tx), UNTAGGED_LABEL);
    }
}
