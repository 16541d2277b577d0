//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Member registration
//! - POST /api/v1/auth/login - Login as member, moderator or administrator
//! - POST /api/v1/auth/guest - Anonymous guest token
//! - POST /api/v1/auth/logout - Revoke the current session
//! - GET /api/v1/auth/me - Current actor

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{client_ip, ApiError, AppState, AuthClaims, Viewer};
use crate::api::responses::{ActorResponse, GuestResponse, MemberResponse, TokenResponse};
use crate::models::ActorType;
use crate::services::{LoginInput, RegisterInput};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Role to log in as; members by default
    #[serde(default = "default_role")]
    pub role: ActorType,
}

fn default_role() -> ActorType {
    ActorType::Member
}

#[derive(Debug, Default, Deserialize)]
pub struct GuestRequest {
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub member: MemberResponse,
    #[serde(flatten)]
    pub token: TokenResponse,
}

#[derive(Debug, Serialize)]
pub struct GuestTokenResponse {
    pub guest: GuestResponse,
    #[serde(flatten)]
    pub token: TokenResponse,
}

/// Routes that need no token
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/guest", post(guest))
}

/// Routes behind the auth middleware
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = RegisterInput {
        email: body.email,
        username: body.username,
        password: body.password,
        display_name: body.display_name,
    };
    let (member, token) = state.auth.register(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            member: member.into(),
            token: token.into(),
        }),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .auth
        .login(LoginInput::new(body.email, body.password, body.role), client_ip(&headers))
        .await?;
    Ok(Json(token.into()))
}

/// POST /api/v1/auth/guest
async fn guest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // The body is optional for guests
    let body: GuestRequest = if body.is_empty() {
        GuestRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::validation_error(format!("Invalid request body: {}", e)))?
    };
    let (guest, token) = state.auth.create_guest(body.display_name, client_ip(&headers)).await?;

    Ok((
        StatusCode::CREATED,
        Json(GuestTokenResponse {
            guest: guest.into(),
            token: token.into(),
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> Result<StatusCode, ApiError> {
    state.auth.logout(&claims).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
async fn me(Viewer(actor): Viewer) -> Json<ActorResponse> {
    Json(actor.into())
}
