//! Content report submission
//!
//! - POST /api/v1/reports - Report a post or a comment

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, CurrentMember};
use crate::api::responses::ReportResponse;

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub reason: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_report))
}

async fn create_report(
    State(state): State<AppState>,
    CurrentMember(member): CurrentMember,
    Json(body): Json<CreateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .reports
        .create(&member, body.post_id, body.comment_id, &body.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(ReportResponse::from(report))))
}
