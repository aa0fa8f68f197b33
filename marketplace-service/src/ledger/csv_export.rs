//! Statement CSV export.
//!
//! UTF-8 with a byte order mark so spreadsheet tools pick the right
//! encoding. Amounts are plain two-decimal numbers without a currency symbol.

use super::statement::{Statement, StatementLine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const BOM: &[u8] = b"\xEF\xBB\xBF";

pub const HEADERS: [&str; 7] = [
    "Date",
    "Type",
    "Reference",
    "Description",
    "Amount",
    "Payment",
    "Balance",
];

pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", super::round_money(amount))
}

/// One statement row as displayed in the on-screen table and written to CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Reference")]
    pub reference: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "Payment")]
    pub payment: String,
    #[serde(rename = "Balance")]
    pub balance: String,
}

impl From<&StatementLine> for StatementRow {
    fn from(line: &StatementLine) -> Self {
        Self {
            date: line.date.format("%Y-%m-%d").to_string(),
            kind: line.kind.label().to_string(),
            reference: line.reference.clone(),
            description: line.description.clone(),
            amount: format_amount(line.amount),
            payment: format_amount(line.payment),
            balance: format_amount(line.balance),
        }
    }
}

pub fn rows(statement: &Statement) -> Vec<StatementRow> {
    statement.lines.iter().map(StatementRow::from).collect()
}

pub fn write_statement_csv(statement: &Statement) -> Result<Vec<u8>, csv::Error> {
    let mut out = BOM.to_vec();
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(true)
            .terminator(csv::Terminator::CRLF)
            .from_writer(&mut out);
        for row in rows(statement) {
            wtr.serialize(row)?;
        }
        // A statement with no activity still gets its header line.
        if statement.lines.is_empty() {
            wtr.write_record(HEADERS)?;
        }
        wtr.flush()?;
    }
    Ok(out)
}

pub fn parse_statement_csv(data: &[u8]) -> Result<Vec<StatementRow>, csv::Error> {
    let data = data.strip_prefix(BOM).unwrap_or(data);
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data)
        .deserialize()
        .collect()
}
