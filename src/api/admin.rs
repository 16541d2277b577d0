//! Administration API endpoints (administrators only)
//!
//! - GET /api/v1/admin/members - Paginated member list
//! - PUT /api/v1/admin/members/{id}/status - Activate or suspend a member
//! - GET /api/v1/admin/moderators - Active moderators
//! - POST /api/v1/admin/moderators - Appoint a moderator
//! - DELETE /api/v1/admin/moderators/{id} - Revoke a moderator
//! - GET /api/v1/admin/audit-logs - Audit trail

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, CurrentAdmin};
use crate::api::responses::{AuditLogResponse, MemberResponse, ModeratorResponse, Paginated};
use crate::models::MemberStatus;

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: MemberStatus,
}

#[derive(Debug, Deserialize)]
pub struct AppointModeratorRequest {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AuditLogFilter {
    pub action: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/members", get(list_members))
        .route("/members/{id}/status", put(set_member_status))
        .route("/moderators", get(list_moderators).post(appoint_moderator))
        .route("/moderators/{id}", delete(revoke_moderator))
        .route("/audit-logs", get(list_audit_logs))
}

async fn list_members(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Paginated<MemberResponse>>, ApiError> {
    let members = state.members.list(page.params()).await?;
    Ok(Json(Paginated::from_page(members)))
}

async fn set_member_status(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<i64>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let member = state.members.set_status(&admin, id, body.status).await?;
    Ok(Json(member.into()))
}

async fn list_moderators(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Vec<ModeratorResponse>>, ApiError> {
    let moderators = state.staff.list_moderators().await?;
    Ok(Json(moderators.into_iter().map(Into::into).collect()))
}

async fn appoint_moderator(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(body): Json<AppointModeratorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let moderator = state.staff.appoint(&admin, body.user_id).await?;
    Ok((StatusCode::CREATED, Json(ModeratorResponse::from(moderator))))
}

async fn revoke_moderator(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.staff.revoke(&admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_audit_logs(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Query(page): Query<PaginationQuery>,
    Query(filter): Query<AuditLogFilter>,
) -> Result<Json<Paginated<AuditLogResponse>>, ApiError> {
    let logs = state.audit.list(filter.action.as_deref(), page.params()).await?;
    Ok(Json(Paginated::from_page(logs)))
}
