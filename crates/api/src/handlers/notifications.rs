//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Rows are written by
//! the notification router in `studiora-events`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use studiora_core::catalog::{clamp_limit, clamp_offset, MAX_PAGE_SIZE};
use studiora_core::error::CoreError;
use studiora_core::types::DbId;
use studiora_db::models::notification::Notification;
use studiora_db::repositories::NotificationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size for notification listing.
const DEFAULT_LIMIT: i64 = 50;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications.
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_PAGE_SIZE);
    let offset = clamp_offset(params.offset);

    let notifications = NotificationRepo::list_for_user(
        &state.pool,
        auth.user_id,
        params.unread_only.unwrap_or(false),
        limit,
        offset,
    )
    .await?;

    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// POST /api/v1/notifications/{id}/read
///
/// 204 on success, 404 if the notification belongs to someone else.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !NotificationRepo::mark_read(&state.pool, notification_id, auth.user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::mark_all_read(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "marked_read": count }
    })))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "count": count }
    })))
}
