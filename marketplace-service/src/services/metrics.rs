//! Prometheus export and the marketplace's domain counters.

use crate::models::CreditNoteReason;
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics recorder already initialized"))
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_payment(amount: Decimal, bulk: bool) {
    let kind = if bulk { "bulk" } else { "single" };
    counter!("marketplace_payments_total", "kind" => kind).increment(1);
    let cents = (amount * Decimal::ONE_HUNDRED).to_u64().unwrap_or(0);
    counter!("marketplace_payment_amount_cents_total").increment(cents);
}

pub fn record_credit_note(reason: CreditNoteReason) {
    counter!("marketplace_credit_notes_total", "reason" => reason.as_str()).increment(1);
}

pub fn record_pdf_render(report: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("marketplace_pdf_renders_total", "report" => report, "outcome" => outcome).increment(1);
}
