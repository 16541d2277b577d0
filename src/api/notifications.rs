//! Notification API endpoints (members only)
//!
//! - GET /api/v1/notifications - Own notifications plus unread count
//! - PUT /api/v1/notifications/{id}/read - Mark one as read
//! - PUT /api/v1/notifications/read-all - Mark all as read
//! - DELETE /api/v1/notifications/{id} - Delete one

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{flag, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, CurrentMember};
use crate::api::responses::{NotificationResponse, Paginated};

#[derive(Debug, Deserialize)]
pub struct NotificationFilter {
    #[serde(default, deserialize_with = "flag")]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    #[serde(flatten)]
    pub page: Paginated<NotificationResponse>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", put(mark_all_read))
        .route("/{id}/read", put(mark_read))
        .route("/{id}", delete(delete_notification))
}

async fn list_notifications(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Query(page): Query<PaginationQuery>,
    Query(filter): Query<NotificationFilter>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let result = state
        .notifications
        .list(&member, filter.unread_only, page.params())
        .await?;
    Ok(Json(NotificationListResponse {
        page: Paginated::from_page(result.page),
        unread_count: result.unread_count,
    }))
}

async fn mark_read(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.notifications.mark_read(&member, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = state.notifications.mark_all_read(&member).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

async fn delete_notification(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.notifications.delete(&member, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
