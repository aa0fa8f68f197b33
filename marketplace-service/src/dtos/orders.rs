use crate::ledger::order_ledger::payment_status_at;
use crate::models::{
    CreditNoteReason, CreditNoteRecord, Order, OrderItem, OrderStatus, PaymentMethod,
    PaymentRecord, PaymentStatus,
};
use crate::utils::validation::{non_negative_amount, not_blank, positive_amount};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[validate(length(min = 1, message = "Product id is required"))]
    pub product_id: String,
    #[validate(range(min = 1, max = 100000, message = "Quantity must be between 1 and 100000"))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Required for sellers and admins; customers order for themselves.
    pub customer_id: Option<String>,
    #[validate(length(min = 1, message = "An order needs at least one item"), nested)]
    pub items: Vec<OrderItemRequest>,
    /// Seller override of the configured delivery fee.
    #[validate(custom(function = "non_negative_amount"))]
    pub delivery_fee: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListParams {
    pub customer_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Only orders that still owe money.
    pub outstanding: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(max = 120))]
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreditNoteRequestBody {
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub reason: CreditNoteReason,
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub notes: String,
}

/// `PATCH /api/orders/{id}` body, tagged by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum OrderPatch {
    UpdateStatus { status: OrderStatus },
    RecordPayment(RecordPaymentRequest),
    CreditNote(CreditNoteRequestBody),
}

impl validator::Validate for OrderPatch {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            OrderPatch::UpdateStatus { .. } => Ok(()),
            OrderPatch::RecordPayment(body) => body.validate(),
            OrderPatch::CreditNote(body) => body.validate(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        Self {
            product_id: i.product_id,
            name: i.name,
            quantity: i.quantity,
            unit_price: i.unit_price,
            line_total: i.line_total,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecordResponse {
    pub transaction_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentRecordResponse {
    fn from(p: PaymentRecord) -> Self {
        Self {
            transaction_id: p.transaction_id,
            amount: p.amount,
            method: p.method,
            reference: p.reference,
            paid_at: p.paid_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditNoteResponse {
    pub transaction_id: String,
    pub amount: Decimal,
    pub reason: CreditNoteReason,
    pub reason_label: &'static str,
    pub notes: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<CreditNoteRecord> for CreditNoteResponse {
    fn from(c: CreditNoteRecord) -> Self {
        Self {
            transaction_id: c.transaction_id,
            amount: c.amount,
            reason: c.reason,
            reason_label: c.reason.label(),
            notes: c.notes,
            created_by: c.created_by,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub seller_id: String,
    pub items: Vec<OrderItemResponse>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub original_total: Option<Decimal>,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub payments: Vec<PaymentRecordResponse>,
    pub credit_notes: Vec<CreditNoteResponse>,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        let payment_status = payment_status_at(&o, Utc::now());
        Self {
            id: o.id,
            customer_id: o.customer_id,
            seller_id: o.seller_id,
            items: o.items.into_iter().map(Into::into).collect(),
            subtotal: o.subtotal,
            delivery_fee: o.delivery_fee,
            total: o.total,
            original_total: o.original_total,
            total_paid: o.total_paid,
            remaining_amount: o.remaining_amount,
            payment_status,
            status: o.status,
            payments: o.payments.into_iter().map(Into::into).collect(),
            credit_notes: o.credit_notes.into_iter().map(Into::into).collect(),
            notes: o.notes,
            due_date: o.due_date,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}
