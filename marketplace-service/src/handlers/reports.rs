use super::statements::build_statement;
use super::{customer_resource, load_customer, scoped_customer_id, target_seller};
use crate::dtos::reports::{CustomerReportRequest, SalesReportRequest};
use crate::ledger::Period;
use crate::policy::{Action, Principal, Resource};
use crate::reports::{build_sales_report, render_html, SalesReportTemplate, StatementTemplate};
use crate::services::metrics::record_pdf_render;
use crate::services::store::{CustomerFilter, OrderFilter};
use crate::startup::AppState;
use crate::utils::validation::ValidatedJson;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use service_core::error::AppError;

async fn render_pdf(
    state: &AppState,
    report: &'static str,
    filename: String,
    html: String,
) -> Result<Response, AppError> {
    let started = std::time::Instant::now();
    let result = state.pdf.render(&html).await;
    record_pdf_render(report, result.is_ok());
    let pdf = result?;

    tracing::info!(
        report = report,
        bytes = pdf.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Report rendered"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", filename),
            ),
        ],
        pdf,
    )
        .into_response())
}

/// Seller sales report as PDF.
///
/// POST /api/generate-report
pub async fn generate_sales_report(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<SalesReportRequest>,
) -> Result<Response, AppError> {
    let seller_id = target_seller(&principal, req.seller_id)?;
    principal.require(Resource::SalesReport { seller_id: &seller_id }, Action::Read)?;

    let period = Period::new(req.from, req.to);
    if !period.is_valid() {
        return Err(AppError::bad_request("Report start date is after its end date"));
    }

    let orders = state
        .store
        .list_orders(&OrderFilter {
            seller_id: Some(seller_id.clone()),
            ..Default::default()
        })
        .await?;
    let customers = state
        .store
        .list_customers(&CustomerFilter {
            seller_id: Some(seller_id.clone()),
            parent_customer_id: None,
        })
        .await?;
    let seller_name = state
        .store
        .get_user(&seller_id)
        .await?
        .map(|u| u.name.unwrap_or(u.email))
        .unwrap_or_else(|| seller_id.clone());

    let now = Utc::now();
    let report = build_sales_report(&seller_id, &orders, &customers, period, now);
    let html = render_html(&SalesReportTemplate::new(
        &report,
        &seller_name,
        &state.config.pricing.currency_symbol,
    ))?;

    render_pdf(
        &state,
        "sales",
        format!("sales-report-{}.pdf", now.format("%Y%m%d")),
        html,
    )
    .await
}

/// Customer statement as PDF, from the same statement as the JSON and CSV
/// exports.
///
/// POST /api/generate-customer-report
pub async fn generate_customer_report(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<CustomerReportRequest>,
) -> Result<Response, AppError> {
    let customer_id = scoped_customer_id(&principal, req.customer_id)?;
    let customer = load_customer(&state, &customer_id).await?;
    principal.require(customer_resource(&customer), Action::Read)?;

    let statement = build_statement(&state, &customer, Period::new(req.from, req.to)).await?;
    let html = render_html(&StatementTemplate::new(
        &statement,
        &state.config.pricing.currency_symbol,
    ))?;

    render_pdf(
        &state,
        "statement",
        format!("statement-{}.pdf", statement.generated_at.format("%Y%m%d")),
        html,
    )
    .await
}
