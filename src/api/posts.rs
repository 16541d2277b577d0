//! Post API endpoints
//!
//! - GET /api/v1/posts - List posts, newest first
//! - POST /api/v1/posts - Create a post
//! - GET /api/v1/posts/{id} - Get a post
//! - PUT /api/v1/posts/{id} - Edit own post
//! - DELETE /api/v1/posts/{id} - Delete own post

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, CurrentMember, Viewer};
use crate::api::responses::{Paginated, PostResponse};

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub body: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
}

async fn list_posts(
    State(state): State<AppState>,
    _viewer: Viewer,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Paginated<PostResponse>>, ApiError> {
    let page = state.posts.list(query.params()).await?;
    Ok(Json(Paginated::from_page(page)))
}

async fn get_post(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(state.posts.get(id).await?.into()))
}

async fn create_post(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Json(body): Json<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.create(&member, &body.title, &body.body).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

async fn update_post(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Path(id): Path<i64>,
    Json(body): Json<PostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.posts.update(&member, id, &body.title, &body.body).await?;
    Ok(Json(post.into()))
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.posts.delete(&member, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
