//! Moderation API endpoints (moderators only)
//!
//! - PUT /api/v1/moderation/posts/{id}/lock, DELETE /api/v1/moderation/posts/{id}
//! - PUT /api/v1/moderation/comments/{id}/lock, DELETE /api/v1/moderation/comments/{id}
//! - GET /api/v1/moderation/reports, PUT /api/v1/moderation/reports/{id}
//! - GET/POST /api/v1/moderation/bans, DELETE /api/v1/moderation/bans/{id}

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{flag, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, CurrentModerator};
use crate::api::responses::{BanResponse, CommentResponse, Paginated, PostResponse, ReportResponse};
use crate::models::ReportStatus;

#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub locked: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveReportRequest {
    pub status: ReportStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBanRequest {
    pub member_id: i64,
    pub reason: String,
    pub duration_hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BanFilter {
    #[serde(default, deserialize_with = "flag")]
    pub active_only: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/lock", put(lock_post))
        .route("/posts/{id}", delete(remove_post))
        .route("/comments/{id}/lock", put(lock_comment))
        .route("/comments/{id}", delete(remove_comment))
        .route("/reports", get(list_reports))
        .route("/reports/{id}", put(resolve_report))
        .route("/bans", get(list_bans).post(create_ban))
        .route("/bans/{id}", delete(lift_ban))
}

/// Removal reason from an optional JSON body
fn removal_reason(body: &Bytes) -> Result<Option<String>, ApiError> {
    if body.is_empty() {
        return Ok(None);
    }
    let request: RemoveRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::validation_error(format!("Invalid request body: {}", e)))?;
    Ok(request.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()))
}

async fn lock_post(
    State(state): State<AppState>,
    CurrentModerator(moderator): CurrentModerator,
    Path(id): Path<i64>,
    Json(body): Json<LockRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.posts.lock(&moderator, id, body.locked).await?;
    Ok(Json(post.into()))
}

async fn remove_post(
    State(state): State<AppState>,
    CurrentModerator(moderator): CurrentModerator,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let reason = removal_reason(&body)?;
    state.posts.remove(&moderator, id, reason.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn lock_comment(
    State(state): State<AppState>,
    CurrentModerator(moderator): CurrentModerator,
    Path(id): Path<i64>,
    Json(body): Json<LockRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state.comments.lock(&moderator, id, body.locked).await?;
    Ok(Json(comment.into()))
}

async fn remove_comment(
    State(state): State<AppState>,
    CurrentModerator(moderator): CurrentModerator,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let reason = removal_reason(&body)?;
    state.comments.remove(&moderator, id, reason.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_reports(
    State(state): State<AppState>,
    _moderator: CurrentModerator,
    Query(page): Query<PaginationQuery>,
    Query(filter): Query<ReportFilter>,
) -> Result<Json<Paginated<ReportResponse>>, ApiError> {
    let reports = state.reports.list(filter.status, page.params()).await?;
    Ok(Json(Paginated::from_page(reports)))
}

async fn resolve_report(
    State(state): State<AppState>,
    CurrentModerator(moderator): CurrentModerator,
    Path(id): Path<i64>,
    Json(body): Json<ResolveReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state
        .reports
        .resolve(&moderator, id, body.status, body.note.as_deref())
        .await?;
    Ok(Json(report.into()))
}

async fn create_ban(
    State(state): State<AppState>,
    CurrentModerator(moderator): CurrentModerator,
    Json(body): Json<CreateBanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ban = state
        .bans
        .create(&moderator, body.member_id, &body.reason, body.duration_hours)
        .await?;
    Ok((StatusCode::CREATED, Json(BanResponse::from(ban))))
}

async fn list_bans(
    State(state): State<AppState>,
    _moderator: CurrentModerator,
    Query(page): Query<PaginationQuery>,
    Query(filter): Query<BanFilter>,
) -> Result<Json<Paginated<BanResponse>>, ApiError> {
    let bans = state.bans.list(filter.active_only, page.params()).await?;
    Ok(Json(Paginated::from_page(bans)))
}

async fn lift_ban(
    State(state): State<AppState>,
    CurrentModerator(moderator): CurrentModerator,
    Path(id): Path<i64>,
) -> Result<Json<BanResponse>, ApiError> {
    let ban = state.bans.lift(&moderator, id).await?;
    Ok(Json(ban.into()))
}
