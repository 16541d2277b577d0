//! Comment API endpoints
//!
//! - GET /api/v1/posts/{id}/comments - Comments on a post, oldest first
//! - POST /api/v1/posts/{id}/comments - Comment or reply
//! - PUT /api/v1/comments/{id} - Edit own comment within the edit window
//! - DELETE /api/v1/comments/{id} - Delete own comment
//! - GET /api/v1/comments/{id}/history - Edit history (author or moderator)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, CurrentMember, Viewer};
use crate::api::responses::{CommentEditResponse, CommentResponse};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments", get(list_comments).post(create_comment))
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
        .route("/comments/{id}/history", get(comment_history))
}

async fn list_comments(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let comments = state.comments.list_by_post(post_id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

async fn create_comment(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Path(post_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comments
        .create(&member, post_id, &body.content, body.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

/// PUT /api/v1/comments/{id}
async fn update_comment(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state.comments.update(&member, id, &body.content).await?;
    Ok(Json(comment.into()))
}

async fn delete_comment(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comments.delete(&member, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn comment_history(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CommentEditResponse>>, ApiError> {
    let history = state.comments.history(&actor, id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}
