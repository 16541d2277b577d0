//! Attachment API endpoints
//!
//! - POST /api/v1/attachments - Upload (multipart field `file`, optional `post_id`)
//! - GET /api/v1/attachments/{id} - Attachment metadata
//! - DELETE /api/v1/attachments/{id} - Delete own attachment
//! - GET /api/v1/posts/{id}/attachments - Attachments of a post
//!
//! - GET /uploads/{name} - Stored file of a live attachment (viewer)

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::api::middleware::{require_auth, ApiError, AppState, CurrentMember, Viewer};
use crate::api::responses::AttachmentResponse;
use crate::services::UploadInput;

/// Multipart overhead allowed on top of the configured file size
const MULTIPART_SLACK: usize = 64 * 1024;

pub fn router(max_file_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_SLACK);

    Router::new()
        .route(
            "/attachments",
            post(upload_attachment).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/attachments/{id}", get(get_attachment).delete(delete_attachment))
        .route("/posts/{id}/attachments", get(list_post_attachments))
}

/// Stored files, mounted outside `/api/v1` but still behind authentication
pub fn uploads_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/uploads/{name}", get(serve_upload))
        .route_layer(axum_middleware::from_fn_with_state(state, require_auth))
}

/// GET /uploads/{name}
async fn serve_upload(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(name): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let (attachment, path) = state.attachments.stored_file(&name).await?;

    let response = ServeFile::new(path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    let mut response = response.map(Body::new);

    if response.status().is_success() {
        let headers = response.headers_mut();
        if let Ok(content_type) = HeaderValue::from_str(&attachment.content_type) {
            headers.insert(header::CONTENT_TYPE, content_type);
        }
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    }
    Ok(response)
}

/// POST /api/v1/attachments
async fn upload_attachment(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut post_id: Option<i64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;
                file = Some((file_name, content_type, data.to_vec()));
            }
            "post_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation_error(format!("Failed to read post_id: {}", e)))?;
                let text = text.trim();
                if !text.is_empty() {
                    post_id = Some(
                        text.parse()
                            .map_err(|_| ApiError::validation_error("post_id must be an integer"))?,
                    );
                }
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| ApiError::validation_error("No file provided"))?;

    let attachment = state
        .attachments
        .upload(
            &member,
            UploadInput {
                file_name: &file_name,
                content_type: &content_type,
                data: &data,
                post_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(AttachmentResponse::from(attachment))))
}

async fn get_attachment(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<AttachmentResponse>, ApiError> {
    Ok(Json(state.attachments.get(id).await?.into()))
}

async fn delete_attachment(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.attachments.delete(&member, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_post_attachments(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<AttachmentResponse>>, ApiError> {
    let attachments = state.attachments.list_by_post(post_id).await?;
    Ok(Json(attachments.into_iter().map(Into::into).collect()))
}
