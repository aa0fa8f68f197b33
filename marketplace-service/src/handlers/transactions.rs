use super::{
    end_of_day, load_customer, load_transaction, scoped_customer_id, start_of_day,
    transaction_resource,
};
use crate::dtos::transactions::{
    AllocationRequest, BulkPaymentRequest, DeleteTransactionParams, DeleteTransactionResponse,
    LedgerUpdateResponse, TransactionListParams, TransactionResponse,
};
use crate::ledger::allocator::{allocate_oldest_first, validate_manual};
use crate::ledger::credit_note::{reason_label, reverse_credit_note};
use crate::ledger::order_ledger::{apply_payment, is_outstanding, reverse_payment};
use crate::ledger::{round_money, CreditNoteError, LedgerError, OutstandingBalance};
use crate::models::{
    Allocation, CreditNoteReason, NotificationKind, Order, PaymentRecord, Role, Transaction,
    TransactionKind,
};
use crate::policy::{Action, Principal, Resource};
use crate::services::metrics::record_payment;
use crate::services::notifier::NotificationDraft;
use crate::services::store::{LedgerCommit, OrderFilter, TransactionFilter};
use crate::startup::AppState;
use crate::utils::money::display_money;
use crate::utils::validation::{QueryParams, ValidatedJson};
use axum::extract::{Path, State};
use chrono::Utc;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// A reason filter matches the stored tag or the displayed label.
fn matches_reason(transaction: &Transaction, reason: &str) -> bool {
    if transaction.kind != TransactionKind::CreditNote {
        return false;
    }
    let wanted = reason
        .parse::<CreditNoteReason>()
        .map(|r| r.label())
        .unwrap_or(reason.trim());
    reason_label(transaction).eq_ignore_ascii_case(wanted)
}

/// Newest first.
///
/// GET /api/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(params): QueryParams<TransactionListParams>,
) -> Result<ApiResponse<Vec<TransactionResponse>>, AppError> {
    let customer_id = match principal.role {
        Role::Customer => Some(scoped_customer_id(&principal, params.customer_id)?),
        _ => params.customer_id,
    };
    let filter = TransactionFilter {
        seller_id: principal.seller_scope().map(str::to_string),
        customer_id,
        kind: params.kind,
        related_order_id: None,
        date_from: params.from.map(start_of_day),
        date_to: params.to.map(end_of_day),
    };

    let transactions = state
        .store
        .list_transactions(&filter)
        .await?
        .into_iter()
        .filter(|t| params.reason.as_deref().is_none_or(|r| matches_reason(t, r)))
        .rev()
        .map(Into::into)
        .collect();

    Ok(ApiResponse::ok(transactions))
}

/// Record one payment spread over a customer's outstanding orders.
///
/// POST /api/transactions
pub async fn create_bulk_payment(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<BulkPaymentRequest>,
) -> Result<ApiResponse<LedgerUpdateResponse>, AppError> {
    let customer = load_customer(&state, &req.customer_id).await?;
    principal.require(
        Resource::Transaction {
            seller_id: &customer.seller_id,
            customer_id: &customer.id,
        },
        Action::Create,
    )?;

    let mut outstanding: HashMap<String, Order> = state
        .store
        .list_orders(&OrderFilter {
            seller_id: Some(customer.seller_id.clone()),
            customer_id: Some(customer.id.clone()),
            ..Default::default()
        })
        .await?
        .into_iter()
        .filter(is_outstanding)
        .map(|o| (o.id.clone(), o))
        .collect();
    let balances: Vec<OutstandingBalance> = outstanding.values().map(OutstandingBalance::from).collect();

    let amount = round_money(req.amount);
    let plan = match req.allocation {
        AllocationRequest::Auto => allocate_oldest_first(amount, &balances)?,
        AllocationRequest::Manual { allocations } => {
            let requested: Vec<Allocation> = allocations
                .into_iter()
                .map(|a| Allocation {
                    order_id: a.order_id,
                    amount: a.amount,
                })
                .collect();
            validate_manual(amount, &requested, &balances)?
        }
    };

    let now = Utc::now();
    let paid_at = req.transaction_date.unwrap_or(now);
    let transaction_id = Uuid::new_v4().to_string();

    let mut touched = Vec::new();
    for allocation in plan.effective() {
        let mut order = outstanding.remove(&allocation.order_id).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Allocation names order {} outside the outstanding set",
                allocation.order_id
            ))
        })?;
        apply_payment(
            &mut order,
            PaymentRecord {
                transaction_id: transaction_id.clone(),
                amount: allocation.amount,
                method: req.method,
                reference: req.reference.clone(),
                paid_at,
            },
            now,
        )?;
        touched.push(order);
    }

    let transaction = Transaction {
        id: transaction_id,
        customer_id: customer.id.clone(),
        seller_id: customer.seller_id.clone(),
        kind: TransactionKind::Payment,
        amount,
        payment_method: Some(req.method),
        reference: req.reference,
        related_order_id: None,
        allocations: plan.allocations.clone(),
        unallocated_amount: plan.unallocated,
        credit_reason: None,
        notes: req.notes,
        created_by: principal.user_id.clone(),
        transaction_date: paid_at,
        created_at: now,
    };

    state
        .store
        .commit_ledger(LedgerCommit::insert(transaction.clone(), touched.clone()))
        .await?;
    record_payment(amount, true);

    tracing::info!(
        transaction_id = %transaction.id,
        customer_id = %customer.id,
        amount = %amount,
        orders = touched.len(),
        unallocated = %plan.unallocated,
        "Bulk payment recorded"
    );
    if plan.unallocated > rust_decimal::Decimal::ZERO {
        tracing::warn!(
            transaction_id = %transaction.id,
            unallocated = %plan.unallocated,
            "Payment exceeds outstanding balance"
        );
    }

    let currency = &state.config.pricing.currency_symbol;
    state
        .notifier
        .notify_customer(
            &customer.id,
            NotificationDraft {
                kind: NotificationKind::PaymentRecorded,
                title: "Payment received".to_string(),
                body: format!(
                    "{} received across {} order(s)",
                    display_money(currency, amount),
                    touched.len()
                ),
                link: Some("/transactions".to_string()),
            },
        )
        .await;

    let orders = touched
        .into_iter()
        .map(|mut o| {
            o.version += 1;
            o.into()
        })
        .collect();
    Ok(ApiResponse::created(LedgerUpdateResponse {
        transaction: transaction.into(),
        orders,
    }))
}

/// Orders a transaction left entries on.
fn affected_order_ids(transaction: &Transaction) -> BTreeSet<String> {
    transaction
        .allocations
        .iter()
        .filter(|a| a.amount > rust_decimal::Decimal::ZERO)
        .map(|a| a.order_id.clone())
        .chain(transaction.related_order_id.clone())
        .collect()
}

/// Delete a transaction, by default undoing its effect on the orders in the
/// same commit.
///
/// DELETE /api/transactions/{id}?reverse=true|false
pub async fn delete_transaction(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<DeleteTransactionParams>,
) -> Result<ApiResponse<DeleteTransactionResponse>, AppError> {
    let transaction = load_transaction(&state, &id).await?;
    principal.require(transaction_resource(&transaction), Action::Delete)?;

    let now = Utc::now();
    let mut orders = Vec::new();
    if params.reverse {
        for order_id in affected_order_ids(&transaction) {
            let Some(mut order) = state.store.get_order(&order_id).await? else {
                tracing::warn!(order_id = %order_id, transaction_id = %transaction.id, "Order missing during reversal");
                continue;
            };
            let reversed = match transaction.kind {
                TransactionKind::Payment => match reverse_payment(&mut order, &transaction.id, now) {
                    Err(LedgerError::UnknownEntry { .. }) => false,
                    other => other.map(|_| true)?,
                },
                TransactionKind::CreditNote => {
                    match reverse_credit_note(&mut order, &transaction.id, now) {
                        Err(CreditNoteError::UnknownCreditNote { .. }) => false,
                        other => other.map(|_| true)?,
                    }
                }
            };
            if reversed {
                orders.push(order);
            } else {
                tracing::warn!(order_id = %order_id, transaction_id = %transaction.id, "Order has no entry to reverse");
            }
        }
    } else {
        tracing::warn!(
            transaction_id = %transaction.id,
            deleted_by = %principal.user_id,
            "Deleting transaction without reversing order balances"
        );
    }

    state
        .store
        .commit_ledger(LedgerCommit::delete(transaction.id.clone(), orders.clone()))
        .await?;

    tracing::info!(
        transaction_id = %transaction.id,
        kind = transaction.kind.as_str(),
        reversed = params.reverse,
        orders = orders.len(),
        deleted_by = %principal.user_id,
        "Transaction deleted"
    );

    Ok(ApiResponse::ok(DeleteTransactionResponse {
        deleted: true,
        reversed: params.reverse,
        orders: orders
            .into_iter()
            .map(|mut o| {
                o.version += 1;
                o.into()
            })
            .collect(),
    }))
}
