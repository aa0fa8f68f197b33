use super::CreditNoteReason;
use super::PaymentMethod;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Prepared,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Prepared => "prepared",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Forward moves one step at a time; cancellation is allowed from any
    /// state that has not been delivered.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Prepared)
                | (Prepared, Delivered)
                | (Pending | Confirmed | Prepared, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// A payment applied to one order. `transaction_id` points at the
/// transaction that carried the money; one bulk payment produces one record
/// on every order it was allocated to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub transaction_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditNoteRecord {
    pub transaction_id: String,
    pub amount: Decimal,
    pub reason: CreditNoteReason,
    pub notes: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer_id: String,
    pub seller_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    /// Current amount owed before payments. Reduced by credit notes.
    pub total: Decimal,
    /// Total as invoiced, captured when the first credit note lands.
    pub original_total: Option<Decimal>,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub credit_notes: Vec<CreditNoteRecord>,
    pub notes: Option<String>,
    #[serde(default, with = "optional_bson_datetime")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every write.
    #[serde(default)]
    pub version: i64,
}

/// `Option<DateTime<Utc>>` stored as a BSON date so it can be range-queried.
mod optional_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(bson::DateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(bson::DateTime::to_chrono))
    }
}

impl Order {
    /// The amount the order was invoiced for, regardless of later credit notes.
    pub fn invoiced_total(&self) -> Decimal {
        self.original_total.unwrap_or(self.total)
    }

    pub fn credited_total(&self) -> Decimal {
        self.credit_notes.iter().map(|c| c.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_single_step() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Prepared));
        assert!(OrderStatus::Prepared.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn due_date_is_stored_as_a_bson_date() {
        let due = Utc::now();
        let order = Order {
            id: "o-1".into(),
            customer_id: "c-1".into(),
            seller_id: "s-1".into(),
            items: vec![],
            subtotal: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            total: Decimal::ZERO,
            original_total: None,
            total_paid: Decimal::ZERO,
            remaining_amount: Decimal::ZERO,
            payment_status: PaymentStatus::Paid,
            status: OrderStatus::Pending,
            payments: vec![],
            credit_notes: vec![],
            notes: None,
            due_date: Some(due),
            created_at: due,
            updated_at: due,
            version: 0,
        };

        let doc = mongodb::bson::to_document(&order).unwrap();
        assert!(doc.get_datetime("due_date").is_ok());

        let back: Order = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(
            back.due_date.map(|d| d.timestamp_millis()),
            Some(due.timestamp_millis())
        );
    }

    #[test]
    fn delivered_and_cancelled_orders_cannot_be_cancelled() {
        assert!(OrderStatus::Prepared.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }
}
