//! Application management handlers.

use axum::extract::{Path, State};
use axum::Json;
use validator::Validate;

use selfinotify_core::error::AppError;
use selfinotify_entity::application::{Application, CreateApplication};

use crate::dto::request::ApplicationRequest;
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiResult;
use crate::state::AppState;

fn into_create(req: ApplicationRequest) -> CreateApplication {
    CreateApplication {
        name: req.name,
        description: req.description,
        platform: req.platform,
    }
}

/// GET /api/applications
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Application>>>> {
    let applications = state.application_service.list().await?;
    Ok(Json(ApiResponse::ok(applications)))
}

/// POST /api/applications
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<ApplicationRequest>,
) -> ApiResult<Json<ApiResponse<Application>>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let application = state.application_service.create(into_create(req)).await?;
    Ok(Json(ApiResponse::ok(application)))
}

/// GET /api/applications/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Application>>> {
    let application = state.application_service.get(id).await?;
    Ok(Json(ApiResponse::ok(application)))
}

/// PUT /api/applications/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ApplicationRequest>,
) -> ApiResult<Json<ApiResponse<Application>>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let application = state
        .application_service
        .update(id, into_create(req))
        .await?;
    Ok(Json(ApiResponse::ok(application)))
}

/// POST /api/applications/{id}/regenerate-token
pub async fn regenerate_token(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Application>>> {
    let application = state.application_service.regenerate_token(id).await?;
    Ok(Json(ApiResponse::ok(application)))
}

/// DELETE /api/applications/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    state.application_service.delete(id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Application deleted".to_string(),
    })))
}
