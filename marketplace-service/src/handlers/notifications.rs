use crate::dtos::messages::{MarkedReadResponse, NotificationListParams, NotificationResponse};
use crate::policy::Principal;
use crate::startup::AppState;
use crate::utils::validation::QueryParams;
use axum::extract::{Path, State};
use service_core::error::AppError;
use service_core::response::ApiResponse;

/// Newest first.
///
/// GET /api/notifications?since&unreadOnly
pub async fn list_notifications(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(params): QueryParams<NotificationListParams>,
) -> Result<ApiResponse<Vec<NotificationResponse>>, AppError> {
    let notifications = state
        .store
        .list_notifications(&principal.user_id, params.since, params.unread_only)
        .await?;
    Ok(ApiResponse::ok(notifications.into_iter().map(Into::into).collect()))
}

/// PATCH /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<ApiResponse<MarkedReadResponse>, AppError> {
    if !state.store.mark_notification_read(&principal.user_id, &id).await? {
        return Err(AppError::not_found(format!("Notification {} not found", id)));
    }
    Ok(ApiResponse::ok(MarkedReadResponse { updated: 1 }))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<ApiResponse<MarkedReadResponse>, AppError> {
    let updated = state
        .store
        .mark_all_notifications_read(&principal.user_id)
        .await?;
    Ok(ApiResponse::ok(MarkedReadResponse { updated }))
}
