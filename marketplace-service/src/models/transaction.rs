use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Payment,
    CreditNote,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Payment => "payment",
            TransactionKind::CreditNote => "credit_note",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Cheque,
    Other,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Card => "Card",
            PaymentMethod::Cheque => "Cheque",
            PaymentMethod::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditNoteReason {
    ReturnedGoods,
    QualityIssue,
    WrongItems,
    DamagedGoods,
    PricingError,
    CustomerComplaint,
    Other,
}

impl CreditNoteReason {
    pub const ALL: [CreditNoteReason; 7] = [
        CreditNoteReason::ReturnedGoods,
        CreditNoteReason::QualityIssue,
        CreditNoteReason::WrongItems,
        CreditNoteReason::DamagedGoods,
        CreditNoteReason::PricingError,
        CreditNoteReason::CustomerComplaint,
        CreditNoteReason::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CreditNoteReason::ReturnedGoods => "Returned Goods",
            CreditNoteReason::QualityIssue => "Quality Issue",
            CreditNoteReason::WrongItems => "Wrong Items",
            CreditNoteReason::DamagedGoods => "Damaged Goods",
            CreditNoteReason::PricingError => "Pricing Error",
            CreditNoteReason::CustomerComplaint => "Customer Complaint",
            CreditNoteReason::Other => "Other",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CreditNoteReason::ReturnedGoods => "returned_goods",
            CreditNoteReason::QualityIssue => "quality_issue",
            CreditNoteReason::WrongItems => "wrong_items",
            CreditNoteReason::DamagedGoods => "damaged_goods",
            CreditNoteReason::PricingError => "pricing_error",
            CreditNoteReason::CustomerComplaint => "customer_complaint",
            CreditNoteReason::Other => "other",
        }
    }
}

impl std::str::FromStr for CreditNoteReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CreditNoteReason::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown credit note reason '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub order_id: String,
    pub amount: Decimal,
}

/// Money movement between a customer and its seller.
///
/// Payments carry a positive amount and the orders they were applied to.
/// Credit notes mirror a single order's credit note with a negative amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer_id: String,
    pub seller_id: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub related_order_id: Option<String>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub unallocated_amount: Decimal,
    /// Absent on credit notes recorded before reasons were tagged.
    pub credit_reason: Option<CreditNoteReason>,
    pub notes: Option<String>,
    pub created_by: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub transaction_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
