use super::orders::OrderResponse;
use crate::ledger::credit_note::reason_label;
use crate::models::{CreditNoteReason, PaymentMethod, Transaction, TransactionKind};
use crate::utils::validation::{non_negative_amount, positive_amount};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AllocationInput {
    #[validate(length(min = 1, message = "Order id is required"))]
    pub order_id: String,
    #[validate(custom(function = "non_negative_amount"))]
    pub amount: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum AllocationRequest {
    #[default]
    Auto,
    Manual { allocations: Vec<AllocationInput> },
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkPaymentRequest {
    #[validate(length(min = 1, message = "Customer id is required"))]
    pub customer_id: String,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(max = 120))]
    pub reference: Option<String>,
    pub transaction_date: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub allocation: AllocationRequest,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListParams {
    pub customer_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    /// Credit note reason, as the stored tag (`damaged_goods`) or its label.
    pub reason: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTransactionParams {
    #[serde(default = "default_reverse")]
    pub reverse: bool,
}

fn default_reverse() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResponse {
    pub order_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: String,
    pub customer_id: String,
    pub seller_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub related_order_id: Option<String>,
    pub allocations: Vec<AllocationResponse>,
    pub unallocated_amount: Decimal,
    pub credit_reason: Option<CreditNoteReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_label: Option<&'static str>,
    pub notes: Option<String>,
    pub created_by: String,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        let reason_label = match t.kind {
            TransactionKind::CreditNote => Some(reason_label(&t)),
            TransactionKind::Payment => None,
        };
        Self {
            id: t.id,
            customer_id: t.customer_id,
            seller_id: t.seller_id,
            kind: t.kind,
            amount: t.amount,
            payment_method: t.payment_method,
            reference: t.reference,
            related_order_id: t.related_order_id,
            allocations: t
                .allocations
                .into_iter()
                .map(|a| AllocationResponse {
                    order_id: a.order_id,
                    amount: a.amount,
                })
                .collect(),
            unallocated_amount: t.unallocated_amount,
            credit_reason: t.credit_reason,
            reason_label,
            notes: t.notes,
            created_by: t.created_by,
            transaction_date: t.transaction_date,
            created_at: t.created_at,
        }
    }
}

/// A recorded payment or credit note with the orders it changed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerUpdateResponse {
    pub transaction: TransactionResponse,
    pub orders: Vec<OrderResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTransactionResponse {
    pub deleted: bool,
    pub reversed: bool,
    /// Orders whose balances were restored.
    pub orders: Vec<OrderResponse>,
}
