//! Member API endpoints
//!
//! - GET /api/v1/members/{id} - Public profile
//! - PUT /api/v1/members/me - Update own display name
//! - DELETE /api/v1/members/me - Leave the board

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, CurrentMember, Viewer};
use crate::api::responses::MemberResponse;

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub display_name: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", put(update_me).delete(delete_me))
        .route("/{id}", get(get_member))
}

async fn get_member(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<MemberResponse>, ApiError> {
    let member = state.members.get_profile(id).await?;
    Ok(Json(member.into()))
}

async fn update_me(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Json(body): Json<UpdateMeRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let member = state.members.update_me(&member, &body.display_name).await?;
    Ok(Json(member.into()))
}

async fn delete_me(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
) -> Result<StatusCode, ApiError> {
    state.members.delete_me(&member).await?;
    Ok(StatusCode::NO_CONTENT)
}
