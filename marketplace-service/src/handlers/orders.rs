use super::{load_customer, load_order, order_resource, scoped_customer_id};
use crate::dtos::orders::{
    CreateOrderRequest, CreditNoteRequestBody, OrderListParams, OrderPatch, OrderResponse,
    RecordPaymentRequest,
};
use crate::dtos::transactions::LedgerUpdateResponse;
use crate::ledger::credit_note::{apply_credit_note, mirror_transaction};
use crate::ledger::order_ledger::{
    apply_payment, derive_payment_status, is_outstanding, transition_status,
};
use crate::ledger::{round_money, CreditNoteRequest};
use crate::models::{
    Allocation, NotificationKind, Order, OrderItem, OrderStatus, PaymentRecord, Role, Transaction,
    TransactionKind,
};
use crate::policy::{Action, Principal, Resource};
use crate::pricing::{delivery_fee, resolve_unit_price};
use crate::services::metrics::{record_credit_note, record_payment};
use crate::services::notifier::NotificationDraft;
use crate::services::store::{LedgerCommit, OrderFilter};
use crate::startup::AppState;
use crate::utils::money::display_money;
use crate::utils::validation::{QueryParams, ValidatedJson};
use axum::extract::{Path, State};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;

fn order_link(order: &Order) -> Option<String> {
    Some(format!("/orders/{}", order.id))
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(params): QueryParams<OrderListParams>,
) -> Result<ApiResponse<Vec<OrderResponse>>, AppError> {
    let customer_id = match principal.role {
        Role::Customer => Some(scoped_customer_id(&principal, params.customer_id)?),
        _ => params.customer_id,
    };
    let filter = OrderFilter {
        seller_id: principal.seller_scope().map(str::to_string),
        customer_id,
        status: params.status,
        payment_status: params.payment_status,
        ..Default::default()
    };

    let outstanding_only = params.outstanding.unwrap_or(false);
    let orders = state
        .store
        .list_orders(&filter)
        .await?
        .into_iter()
        .filter(|o| !outstanding_only || is_outstanding(o))
        .rev()
        .map(Into::into)
        .collect();

    Ok(ApiResponse::ok(orders))
}

/// Checkout. Prices, delivery fee and due date are all fixed here.
///
/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<CreateOrderRequest>,
) -> Result<ApiResponse<OrderResponse>, AppError> {
    let customer_id = scoped_customer_id(&principal, req.customer_id)?;
    let customer = load_customer(&state, &customer_id).await?;
    principal.require(
        Resource::Order {
            seller_id: &customer.seller_id,
            customer_id: &customer.id,
        },
        Action::Create,
    )?;
    let parent = match &customer.parent_customer_id {
        Some(parent_id) => state.store.get_customer(parent_id).await?,
        None => None,
    };

    let mut items = Vec::with_capacity(req.items.len());
    for line in &req.items {
        let product = state
            .store
            .get_product(&line.product_id)
            .await?
            .filter(|p| p.seller_id == customer.seller_id && p.active)
            .ok_or_else(|| {
                AppError::bad_request(format!("Product {} is not available", line.product_id))
            })?;
        let unit_price = resolve_unit_price(&product, &customer, parent.as_ref());
        items.push(OrderItem {
            product_id: product.id,
            name: product.name,
            quantity: line.quantity,
            unit_price,
            line_total: round_money(unit_price * Decimal::from(line.quantity)),
        });
    }

    let subtotal = round_money(items.iter().map(|i| i.line_total).sum());
    // Only the seller side may override the delivery fee.
    let fee_override = match principal.role {
        Role::Customer => None,
        _ => req.delivery_fee,
    };
    let fee = delivery_fee(subtotal, &state.config.pricing, fee_override);
    let total = round_money(subtotal + fee);

    let now = Utc::now();
    let terms_days = customer
        .payment_terms_days
        .unwrap_or(state.config.pricing.default_payment_terms_days);
    let due_date = req
        .due_date
        .unwrap_or_else(|| now + Duration::days(i64::from(terms_days)));

    let order = Order {
        id: Uuid::new_v4().to_string(),
        customer_id: customer.id.clone(),
        seller_id: customer.seller_id.clone(),
        items,
        subtotal,
        delivery_fee: fee,
        total,
        original_total: None,
        total_paid: round_money(Decimal::ZERO),
        remaining_amount: total,
        payment_status: derive_payment_status(total, Decimal::ZERO, Some(due_date), now),
        status: OrderStatus::Pending,
        payments: vec![],
        credit_notes: vec![],
        notes: req.notes,
        due_date: Some(due_date),
        created_at: now,
        updated_at: now,
        version: 0,
    };

    state.store.insert_order(&order).await?;
    tracing::info!(
        order_id = %order.id,
        customer_id = %order.customer_id,
        total = %order.total,
        placed_by = %principal.user_id,
        "Order placed"
    );

    let draft = NotificationDraft {
        kind: NotificationKind::OrderPlaced,
        title: "New order".to_string(),
        body: format!(
            "{} placed an order for {}",
            customer.business_name,
            display_money(&state.config.pricing.currency_symbol, order.total)
        ),
        link: order_link(&order),
    };
    match principal.role {
        Role::Customer => state.notifier.notify_seller(&order.seller_id, draft).await,
        _ => state.notifier.notify_customer(&order.customer_id, draft).await,
    }

    Ok(ApiResponse::created(order.into()))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<ApiResponse<OrderResponse>, AppError> {
    let order = load_order(&state, &id).await?;
    principal.require(order_resource(&order), Action::Read)?;
    Ok(ApiResponse::ok(order.into()))
}

/// PATCH /api/orders/{id}
pub async fn patch_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<OrderPatch>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let order = load_order(&state, &id).await?;
    principal.require(order_resource(&order), Action::Update)?;

    let data = match patch {
        OrderPatch::UpdateStatus { status } => {
            let order = update_status(&state, &principal, order, status).await?;
            serde_json::to_value(OrderResponse::from(order))
        }
        OrderPatch::RecordPayment(body) => {
            let update = record_payment_on_order(&state, &principal, order, body).await?;
            serde_json::to_value(update)
        }
        OrderPatch::CreditNote(body) => {
            let update = issue_credit_note(&state, &principal, order, body).await?;
            serde_json::to_value(update)
        }
    }
    .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to serialize order: {}", e)))?;

    Ok(ApiResponse::ok(data))
}

async fn update_status(
    state: &AppState,
    principal: &Principal,
    mut order: Order,
    next: OrderStatus,
) -> Result<Order, AppError> {
    if principal.role == Role::Customer
        && !(next == OrderStatus::Cancelled && order.status == OrderStatus::Pending)
    {
        return Err(AppError::forbidden("Customers can only cancel pending orders"));
    }

    let previous = order.status;
    transition_status(&mut order, next, Utc::now())?;
    state
        .store
        .commit_ledger(LedgerCommit::orders(vec![order.clone()]))
        .await?;
    order.version += 1;

    tracing::info!(
        order_id = %order.id,
        from = previous.as_str(),
        to = next.as_str(),
        changed_by = %principal.user_id,
        "Order status changed"
    );

    let draft = NotificationDraft {
        kind: NotificationKind::OrderStatusChanged,
        title: "Order updated".to_string(),
        body: format!("Order is now {}", next.as_str()),
        link: order_link(&order),
    };
    match principal.role {
        Role::Customer => state.notifier.notify_seller(&order.seller_id, draft).await,
        _ => state.notifier.notify_customer(&order.customer_id, draft).await,
    }

    Ok(order)
}

/// Payment against a single order. Overpayment is refused; bulk payments
/// are the way to record money that does not fit one order.
async fn record_payment_on_order(
    state: &AppState,
    principal: &Principal,
    mut order: Order,
    body: RecordPaymentRequest,
) -> Result<LedgerUpdateResponse, AppError> {
    principal.require_role(&[Role::Seller, Role::Admin])?;

    let now = Utc::now();
    let paid_at = body.paid_at.unwrap_or(now);
    let amount = round_money(body.amount);
    let transaction_id = Uuid::new_v4().to_string();

    apply_payment(
        &mut order,
        PaymentRecord {
            transaction_id: transaction_id.clone(),
            amount,
            method: body.method,
            reference: body.reference.clone(),
            paid_at,
        },
        now,
    )?;

    let transaction = Transaction {
        id: transaction_id,
        customer_id: order.customer_id.clone(),
        seller_id: order.seller_id.clone(),
        kind: TransactionKind::Payment,
        amount,
        payment_method: Some(body.method),
        reference: body.reference,
        related_order_id: Some(order.id.clone()),
        allocations: vec![Allocation {
            order_id: order.id.clone(),
            amount,
        }],
        unallocated_amount: round_money(Decimal::ZERO),
        credit_reason: None,
        notes: None,
        created_by: principal.user_id.clone(),
        transaction_date: paid_at,
        created_at: now,
    };

    state
        .store
        .commit_ledger(LedgerCommit::insert(transaction.clone(), vec![order.clone()]))
        .await?;
    order.version += 1;
    record_payment(amount, false);

    tracing::info!(
        order_id = %order.id,
        transaction_id = %transaction.id,
        amount = %amount,
        remaining = %order.remaining_amount,
        payment_status = order.payment_status.as_str(),
        "Payment recorded"
    );

    state
        .notifier
        .notify_customer(
            &order.customer_id,
            NotificationDraft {
                kind: NotificationKind::PaymentRecorded,
                title: "Payment received".to_string(),
                body: format!(
                    "{} received, {} remaining",
                    display_money(&state.config.pricing.currency_symbol, amount),
                    display_money(&state.config.pricing.currency_symbol, order.remaining_amount)
                ),
                link: order_link(&order),
            },
        )
        .await;

    Ok(LedgerUpdateResponse {
        transaction: transaction.into(),
        orders: vec![order.into()],
    })
}

async fn issue_credit_note(
    state: &AppState,
    principal: &Principal,
    mut order: Order,
    body: CreditNoteRequestBody,
) -> Result<LedgerUpdateResponse, AppError> {
    principal.require_role(&[Role::Seller, Role::Admin])?;

    let now = Utc::now();
    let request = CreditNoteRequest {
        amount: body.amount,
        reason: body.reason,
        notes: body.notes,
        created_by: principal.user_id.clone(),
    };
    let record = apply_credit_note(&mut order, &Uuid::new_v4().to_string(), &request, now)?;
    let transaction = mirror_transaction(&order, &record);

    state
        .store
        .commit_ledger(LedgerCommit::insert(transaction.clone(), vec![order.clone()]))
        .await?;
    order.version += 1;
    record_credit_note(record.reason);

    tracing::info!(
        order_id = %order.id,
        transaction_id = %transaction.id,
        amount = %record.amount,
        reason = record.reason.as_str(),
        total = %order.total,
        "Credit note issued"
    );

    state
        .notifier
        .notify_customer(
            &order.customer_id,
            NotificationDraft {
                kind: NotificationKind::CreditNoteIssued,
                title: "Credit note issued".to_string(),
                body: format!(
                    "{} credited ({})",
                    display_money(&state.config.pricing.currency_symbol, record.amount),
                    record.reason.label()
                ),
                link: order_link(&order),
            },
        )
        .await;

    Ok(LedgerUpdateResponse {
        transaction: transaction.into(),
        orders: vec![order.into()],
    })
}
