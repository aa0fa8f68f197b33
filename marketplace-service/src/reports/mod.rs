//! Printable reports: view models for the HTML templates that are turned
//! into PDFs.

mod sales;

pub use sales::{build_sales_report, CustomerSales, ProductSales, SalesReport};

use crate::ledger::statement::{Period, Statement};
use crate::utils::money::display_money;
use askama::Template;
use chrono::{DateTime, Utc};
use service_core::error::AppError;

fn period_label(period: &Period) -> String {
    match (period.from, period.to) {
        (Some(from), Some(to)) => format!("{} to {}", from, to),
        (Some(from), None) => format!("From {}", from),
        (None, Some(to)) => format!("Up to {}", to),
        (None, None) => "All activity".to_string(),
    }
}

fn generated_label(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub struct StatementRowView {
    pub date: String,
    pub kind: &'static str,
    pub reference: String,
    pub description: String,
    pub amount: String,
    pub payment: String,
    pub balance: String,
}

pub struct TotalView {
    pub label: String,
    pub value: String,
}

#[derive(Template)]
#[template(path = "statement.html")]
pub struct StatementTemplate {
    pub business_name: String,
    pub contact_lines: Vec<String>,
    pub period: String,
    pub generated: String,
    pub rows: Vec<StatementRowView>,
    pub totals: Vec<TotalView>,
    pub reasons: Vec<TotalView>,
}

impl StatementTemplate {
    pub fn new(statement: &Statement, currency: &str) -> Self {
        let money = |amount| display_money(currency, amount);
        let customer = &statement.customer;
        let contact_lines = [
            customer.contact_name.clone(),
            customer.address.clone(),
            customer.email.clone(),
            customer.vat_number.as_ref().map(|v| format!("VAT {}", v)),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            business_name: customer.business_name.clone(),
            contact_lines,
            period: period_label(&statement.period),
            generated: generated_label(statement.generated_at),
            rows: statement
                .lines
                .iter()
                .map(|line| StatementRowView {
                    date: line.date.format("%Y-%m-%d").to_string(),
                    kind: line.kind.label(),
                    reference: line.reference.clone(),
                    description: line.description.clone(),
                    amount: money(line.amount),
                    payment: money(line.payment),
                    balance: money(line.balance),
                })
                .collect(),
            totals: vec![
                TotalView { label: "Total invoiced".into(), value: money(statement.total_invoiced) },
                TotalView { label: "Total paid".into(), value: money(statement.total_paid) },
                TotalView { label: "Total credited".into(), value: money(statement.total_credited) },
                TotalView { label: "Closing balance".into(), value: money(statement.closing_balance) },
            ],
            reasons: statement
                .credit_notes_by_reason
                .iter()
                .map(|r| TotalView {
                    label: format!("{} ({})", r.reason, r.count),
                    value: money(r.total),
                })
                .collect(),
        }
    }
}

pub struct CustomerSalesView {
    pub business_name: String,
    pub orders: usize,
    pub invoiced: String,
    pub credited: String,
    pub paid: String,
    pub outstanding: String,
}

pub struct ProductSalesView {
    pub name: String,
    pub quantity: u64,
    pub revenue: String,
}

#[derive(Template)]
#[template(path = "sales_report.html")]
pub struct SalesReportTemplate {
    pub seller_name: String,
    pub period: String,
    pub generated: String,
    pub order_count: usize,
    pub customers: Vec<CustomerSalesView>,
    pub products: Vec<ProductSalesView>,
    pub totals: Vec<TotalView>,
}

impl SalesReportTemplate {
    pub fn new(report: &SalesReport, seller_name: &str, currency: &str) -> Self {
        let money = |amount| display_money(currency, amount);
        Self {
            seller_name: seller_name.to_string(),
            period: period_label(&report.period),
            generated: generated_label(report.generated_at),
            order_count: report.order_count,
            customers: report
                .customers
                .iter()
                .map(|c| CustomerSalesView {
                    business_name: c.business_name.clone(),
                    orders: c.orders,
                    invoiced: money(c.invoiced),
                    credited: money(c.credited),
                    paid: money(c.paid),
                    outstanding: money(c.outstanding),
                })
                .collect(),
            products: report
                .products
                .iter()
                .map(|p| ProductSalesView {
                    name: p.name.clone(),
                    quantity: p.quantity,
                    revenue: money(p.revenue),
                })
                .collect(),
            totals: vec![
                TotalView { label: "Invoiced".into(), value: money(report.total_invoiced) },
                TotalView { label: "Credited".into(), value: money(report.total_credited) },
                TotalView { label: "Paid".into(), value: money(report.total_paid) },
                TotalView { label: "Outstanding".into(), value: money(report.total_outstanding) },
            ],
        }
    }
}

pub fn render_html<T: Template>(template: &T) -> Result<String, AppError> {
    template
        .render()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to render report: {}", e)))
}
