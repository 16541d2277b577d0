//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its status mapping
//! - Bearer token authentication
//! - Role extractors backed by the authorization providers

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::net::IpAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::models::{Administrator, Guest, Member, Moderator};
use crate::services::{
    Actor, AttachmentService, AuditService, AuthService, BanService, Claims, CommentService,
    MemberService, NotificationService, PostService, ReportService, ServiceError, Services,
    StaffService,
};

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub auth: Arc<AuthService>,
    pub members: Arc<MemberService>,
    pub staff: Arc<StaffService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub reports: Arc<ReportService>,
    pub bans: Arc<BanService>,
    pub notifications: Arc<NotificationService>,
    pub audit: Arc<AuditService>,
    pub attachments: Arc<AttachmentService>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> anyhow::Result<Self> {
        let Services {
            auth,
            members,
            staff,
            posts,
            comments,
            reports,
            bans,
            notifications,
            audit,
            attachments,
        } = Services::new(pool.clone(), config)?;

        Ok(Self {
            pool,
            auth,
            members,
            staff,
            posts,
            comments,
            reports,
            bans,
            notifications,
            audit,
            attachments,
        })
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => ApiError::validation_error(msg),
            ServiceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ServiceError::RateLimited {
                message,
                retry_after_secs,
            } => ApiError::with_details(
                "RATE_LIMIT",
                message,
                serde_json::json!({ "retry_after": retry_after_secs }),
            ),
            ServiceError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Client address from proxy headers (X-Forwarded-For, then X-Real-IP)
pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next().and_then(|ip| ip.trim().parse().ok()) {
            return Some(ip);
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok())
}

/// Authentication middleware
///
/// Verifies the bearer token and its session, then stores the claims in the
/// request extensions for the role extractors.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let claims = state.auth.authenticate(token).await?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn claims_from(parts: &Parts) -> Result<Claims, ApiError> {
    parts
        .extensions
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

/// Verified token claims
#[derive(Debug, Clone)]
pub struct AuthClaims(pub Claims);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        claims_from(parts).map(AuthClaims)
    }
}

/// Active member behind the request
#[derive(Debug, Clone)]
pub struct CurrentMember(pub Member);

impl FromRequestParts<AppState> for CurrentMember {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_from(parts)?;
        Ok(CurrentMember(state.auth.authorize_member(&claims).await?))
    }
}

/// Active moderator behind the request
#[derive(Debug, Clone)]
pub struct CurrentModerator(pub Moderator);

impl FromRequestParts<AppState> for CurrentModerator {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_from(parts)?;
        Ok(CurrentModerator(state.auth.authorize_moderator(&claims).await?))
    }
}

/// Active administrator behind the request
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub Administrator);

impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_from(parts)?;
        Ok(CurrentAdmin(state.auth.authorize_administrator(&claims).await?))
    }
}

#[derive(Debug, Clone)]
pub struct CurrentGuest(pub Guest);

impl FromRequestParts<AppState> for CurrentGuest {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_from(parts)?;
        Ok(CurrentGuest(state.auth.authorize_guest(&claims).await?))
    }
}

/// Any authorized role; used by read endpoints
#[derive(Debug, Clone)]
pub struct Viewer(pub Actor);

impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_from(parts)?;
        Ok(Viewer(state.auth.authorize_viewer(&claims).await?))
    }
}
