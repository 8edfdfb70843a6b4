//! Notification send, retry, history, and stats handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use validator::Validate;

use selfinotify_core::error::AppError;
use selfinotify_database::repositories::notification::{
    NotificationHistoryEntry, NotificationStats,
};
use selfinotify_entity::notification::Notification;
use selfinotify_service::{BulkSendReport, SendNotification};

use crate::dto::request::{
    BulkDeleteRequest, BulkSendRequest, HistoryQuery, SendNotificationRequest, TestSendRequest,
};
use crate::dto::response::{ApiResponse, BulkDeleteResponse, MessageResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/notifications/send
pub async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendNotificationRequest>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let record = state
        .notification_service
        .send(SendNotification {
            application_id: req.application_id,
            title: req.title,
            message: req.message,
            file_url: req.file_url,
        })
        .await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// POST /api/notifications/bulk-send
pub async fn bulk_send(
    State(state): State<AppState>,
    Json(req): Json<BulkSendRequest>,
) -> ApiResult<Json<ApiResponse<BulkSendReport>>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let report = state
        .notification_service
        .bulk_send(
            &req.application_ids,
            &req.title,
            &req.message,
            req.file_url.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// POST /api/notifications/test
pub async fn send_test(
    State(state): State<AppState>,
    Json(req): Json<TestSendRequest>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let record = state
        .notification_service
        .send_test(req.application_id)
        .await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// POST /api/notifications/{id}/resend
pub async fn resend(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let record = state.notification_service.resend(id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// POST /api/notifications/{id}/retry
pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let record = state.notification_service.retry(id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// GET /api/notifications/history
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ApiResponse<Vec<NotificationHistoryEntry>>>> {
    let entries = state
        .notification_service
        .history(
            query.application_id,
            query.status,
            query.limit.unwrap_or(50),
            query.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(ApiResponse::ok(entries)))
}

/// GET /api/notifications/stats
pub async fn stats(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<NotificationStats>>> {
    let stats = state.notification_service.stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/notifications/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let record = state.notification_service.get(id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// DELETE /api/notifications/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    state.notification_service.delete(id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Notification deleted".to_string(),
    })))
}

/// POST /api/notifications/bulk-delete
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(req): Json<BulkDeleteRequest>,
) -> ApiResult<Json<ApiResponse<BulkDeleteResponse>>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let deleted_count = state.notification_service.delete_many(&req.ids).await?;
    Ok(Json(ApiResponse::ok(BulkDeleteResponse { deleted_count })))
}
