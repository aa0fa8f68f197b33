use super::{customer_resource, load_customer};
use crate::dtos::customers::StatementParams;
use crate::ledger::csv_export::write_statement_csv;
use crate::ledger::{Period, Statement, StatementBuilder};
use crate::models::Customer;
use crate::policy::{Action, Principal};
use crate::services::store::{OrderFilter, TransactionFilter};
use crate::startup::AppState;
use crate::utils::validation::QueryParams;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use service_core::error::AppError;
use service_core::response::ApiResponse;

/// Build the statement every output format is rendered from.
pub(crate) async fn build_statement(
    state: &AppState,
    customer: &Customer,
    period: Period,
) -> Result<Statement, AppError> {
    if !period.is_valid() {
        return Err(AppError::bad_request("Statement start date is after its end date"));
    }

    let orders = state
        .store
        .list_orders(&OrderFilter {
            customer_id: Some(customer.id.clone()),
            ..Default::default()
        })
        .await?;
    let transactions = state
        .store
        .list_transactions(&TransactionFilter {
            customer_id: Some(customer.id.clone()),
            ..Default::default()
        })
        .await?;

    let statement = StatementBuilder::new(customer, period)
        .orders(&orders)
        .transactions(&transactions)
        .build(Utc::now());

    tracing::debug!(
        customer_id = %customer.id,
        lines = statement.lines.len(),
        closing_balance = %statement.closing_balance,
        "Statement built"
    );
    Ok(statement)
}

fn csv_filename(statement: &Statement) -> String {
    let slug: String = statement
        .customer
        .business_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!(
        "statement-{}-{}.csv",
        slug.trim_matches('-'),
        statement.generated_at.format("%Y%m%d")
    )
}

/// GET /api/customers/{id}/statement?from&to&format=json|csv
pub async fn customer_statement(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<StatementParams>,
) -> Result<Response, AppError> {
    let customer = load_customer(&state, &id).await?;
    principal.require(customer_resource(&customer), Action::Read)?;

    let statement = build_statement(&state, &customer, Period::new(params.from, params.to)).await?;

    match params.format.as_deref().unwrap_or("json") {
        "json" => Ok(ApiResponse::ok(statement).into_response()),
        "csv" => {
            let body = write_statement_csv(&statement)
                .map_err(|e| AppError::InternalError(anyhow::anyhow!("CSV export failed: {}", e)))?;
            let disposition = format!("attachment; filename=\"{}\"", csv_filename(&statement));
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
        other => Err(AppError::bad_request(format!(
            "Unsupported statement format: {}",
            other
        ))),
    }
}
