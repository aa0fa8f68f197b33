use super::{load_customer, scoped_customer_id};
use crate::dtos::messages::{MessageListParams, MessageResponse, SendMessageRequest};
use crate::models::{Customer, Message, NotificationKind, Role};
use crate::policy::{Action, Principal, Resource};
use crate::services::notifier::NotificationDraft;
use crate::startup::AppState;
use crate::utils::validation::{QueryParams, ValidatedJson};
use axum::extract::State;
use chrono::Utc;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;

fn conversation(customer: &Customer) -> Resource<'_> {
    Resource::Conversation {
        seller_id: &customer.seller_id,
        customer_id: &customer.id,
    }
}

const PREVIEW_CHARS: usize = 80;

/// Oldest first; pass `since` to poll for new messages.
///
/// GET /api/messages?customerId&since
pub async fn list_messages(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(params): QueryParams<MessageListParams>,
) -> Result<ApiResponse<Vec<MessageResponse>>, AppError> {
    let customer_id = scoped_customer_id(&principal, params.customer_id)?;
    let customer = load_customer(&state, &customer_id).await?;
    principal.require(conversation(&customer), Action::Read)?;

    let messages = state.store.list_messages(&customer.id, params.since).await?;
    Ok(ApiResponse::ok(messages.into_iter().map(Into::into).collect()))
}

/// POST /api/messages
pub async fn send_message(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> Result<ApiResponse<MessageResponse>, AppError> {
    let customer_id = scoped_customer_id(&principal, req.customer_id)?;
    let customer = load_customer(&state, &customer_id).await?;
    principal.require(conversation(&customer), Action::Create)?;

    let message = Message {
        id: Uuid::new_v4().to_string(),
        customer_id: customer.id.clone(),
        seller_id: customer.seller_id.clone(),
        sender_id: principal.user_id.clone(),
        sender_role: principal.role,
        body: req.body.trim().to_string(),
        created_at: Utc::now(),
    };
    state.store.insert_message(&message).await?;
    tracing::debug!(message_id = %message.id, customer_id = %customer.id, "Message sent");

    let preview: String = message.body.chars().take(PREVIEW_CHARS).collect();
    let draft = NotificationDraft {
        kind: NotificationKind::NewMessage,
        title: match principal.role {
            Role::Customer => format!("Message from {}", customer.business_name),
            _ => "New message from your supplier".to_string(),
        },
        body: preview,
        link: Some(format!("/messages?customerId={}", customer.id)),
    };
    match principal.role {
        Role::Customer => state.notifier.notify_seller(&customer.seller_id, draft).await,
        _ => state.notifier.notify_customer(&customer.id, draft).await,
    }

    Ok(ApiResponse::created(message.into()))
}
