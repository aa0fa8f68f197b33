use super::credit_note::reason_label;
use super::round_money;
use crate::models::{Customer, Order, OrderStatus, Transaction, TransactionKind};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

fn document_number(prefix: &str, id: &str, created_at: DateTime<Utc>) -> String {
    let chars: Vec<char> = id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(6)..].iter().collect();
    format!(
        "{}-{}{:02}-{}",
        prefix,
        created_at.year(),
        created_at.month(),
        tail.to_uppercase()
    )
}

/// `INV-YYYYMM-XXXXXX` from the order's creation month and id tail.
pub fn invoice_number(order: &Order) -> String {
    document_number("INV", &order.id, order.created_at)
}

pub fn credit_note_number(transaction: &Transaction) -> String {
    document_number("CN", &transaction.id, transaction.created_at)
}

pub fn payment_number(transaction: &Transaction) -> String {
    document_number("PAY", &transaction.id, transaction.created_at)
}

/// Inclusive date range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Period {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Period {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }

    pub fn is_valid(&self) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementLineKind {
    Invoice,
    Payment,
    CreditNote,
}

impl StatementLineKind {
    pub fn label(&self) -> &'static str {
        match self {
            StatementLineKind::Invoice => "Invoice",
            StatementLineKind::Payment => "Payment",
            StatementLineKind::CreditNote => "Credit Note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementLine {
    pub date: DateTime<Utc>,
    pub kind: StatementLineKind,
    pub reference: String,
    pub description: String,
    /// Charged to the customer. Negative for credit notes.
    pub amount: Decimal,
    /// Received from the customer.
    pub payment: Decimal,
    pub balance: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementCustomer {
    pub id: String,
    pub business_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub vat_number: Option<String>,
}

impl From<&Customer> for StatementCustomer {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id.clone(),
            business_name: c.business_name.clone(),
            contact_name: c.contact_name.clone(),
            email: c.email.clone(),
            address: c.address.clone(),
            vat_number: c.vat_number.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonTotal {
    pub reason: String,
    pub count: usize,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub customer: StatementCustomer,
    pub period: Period,
    pub lines: Vec<StatementLine>,
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    /// Sum of credit notes as a positive figure.
    pub total_credited: Decimal,
    pub closing_balance: Decimal,
    pub credit_notes_by_reason: Vec<ReasonTotal>,
    pub generated_at: DateTime<Utc>,
}

/// Merges a customer's invoices, payments and credit notes for a period
/// into one dated activity feed with a running balance.
pub struct StatementBuilder<'a> {
    customer: &'a Customer,
    period: Period,
    orders: &'a [Order],
    transactions: &'a [Transaction],
}

impl<'a> StatementBuilder<'a> {
    pub fn new(customer: &'a Customer, period: Period) -> Self {
        Self {
            customer,
            period,
            orders: &[],
            transactions: &[],
        }
    }

    pub fn orders(mut self, orders: &'a [Order]) -> Self {
        self.orders = orders;
        self
    }

    pub fn transactions(mut self, transactions: &'a [Transaction]) -> Self {
        self.transactions = transactions;
        self
    }

    fn invoice_line(order: &Order) -> StatementLine {
        let items = order.items.iter().map(|i| i.quantity).sum::<u32>();
        StatementLine {
            date: order.created_at,
            kind: StatementLineKind::Invoice,
            reference: invoice_number(order),
            description: format!("Invoice ({} items)", items),
            amount: round_money(order.invoiced_total()),
            payment: Decimal::ZERO,
            balance: Decimal::ZERO,
            order_id: Some(order.id.clone()),
            transaction_id: None,
        }
    }

    fn payment_line(tx: &Transaction) -> StatementLine {
        let method = tx.payment_method.map(|m| m.label()).unwrap_or("Payment");
        let description = match tx.reference.as_deref() {
            Some(reference) if !reference.is_empty() => {
                format!("Payment - {} ({})", method, reference)
            }
            _ => format!("Payment - {}", method),
        };
        StatementLine {
            date: tx.transaction_date,
            kind: StatementLineKind::Payment,
            reference: payment_number(tx),
            description,
            amount: Decimal::ZERO,
            payment: round_money(tx.amount),
            balance: Decimal::ZERO,
            order_id: None,
            transaction_id: Some(tx.id.clone()),
        }
    }

    fn credit_note_line(&self, tx: &Transaction) -> StatementLine {
        let invoice = tx
            .related_order_id
            .as_deref()
            .and_then(|id| self.orders.iter().find(|o| o.id == id))
            .map(invoice_number);
        let label = reason_label(tx);
        let description = match invoice {
            Some(invoice) => format!("Credit Note - {} ({})", label, invoice),
            None => format!("Credit Note - {}", label),
        };
        StatementLine {
            date: tx.transaction_date,
            kind: StatementLineKind::CreditNote,
            reference: credit_note_number(tx),
            description,
            amount: -round_money(tx.amount.abs()),
            payment: Decimal::ZERO,
            balance: Decimal::ZERO,
            order_id: tx.related_order_id.clone(),
            transaction_id: Some(tx.id.clone()),
        }
    }

    pub fn build(self, now: DateTime<Utc>) -> Statement {
        let mut lines: Vec<StatementLine> = self
            .orders
            .iter()
            .filter(|o| o.customer_id == self.customer.id)
            .filter(|o| o.status != OrderStatus::Cancelled && self.period.contains(o.created_at))
            .map(Self::invoice_line)
            .collect();

        let mut by_reason: BTreeMap<&'static str, (usize, Decimal)> = BTreeMap::new();
        for tx in self
            .transactions
            .iter()
            .filter(|t| t.customer_id == self.customer.id && self.period.contains(t.transaction_date))
        {
            match tx.kind {
                TransactionKind::Payment => lines.push(Self::payment_line(tx)),
                TransactionKind::CreditNote => {
                    let line = self.credit_note_line(tx);
                    let entry = by_reason.entry(reason_label(tx)).or_default();
                    entry.0 += 1;
                    entry.1 -= line.amount;
                    lines.push(line);
                }
            }
        }

        lines.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.reference.cmp(&b.reference))
        });

        let mut balance = Decimal::ZERO;
        let mut total_invoiced = Decimal::ZERO;
        let mut total_paid = Decimal::ZERO;
        let mut total_credited = Decimal::ZERO;
        for line in &mut lines {
            balance += line.amount - line.payment;
            line.balance = balance;
            match line.kind {
                StatementLineKind::Invoice => total_invoiced += line.amount,
                StatementLineKind::Payment => total_paid += line.payment,
                StatementLineKind::CreditNote => total_credited -= line.amount,
            }
        }

        Statement {
            customer: StatementCustomer::from(self.customer),
            period: self.period,
            lines,
            total_invoiced,
            total_paid,
            total_credited,
            closing_balance: total_invoiced - total_paid - total_credited,
            credit_notes_by_reason: by_reason
                .into_iter()
                .map(|(reason, (count, total))| ReasonTotal {
                    reason: reason.to_string(),
                    count,
                    total,
                })
                .collect(),
            generated_at: now,
        }
    }
}
