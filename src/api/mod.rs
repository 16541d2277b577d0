//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api/v1`, except stored files at `/uploads`.
//! Apart from register, login and guest token creation, every route sits
//! behind [`middleware::require_auth`]; the handlers then pick the role they
//! need through the extractors in [`middleware`].

pub mod admin;
pub mod attachments;
pub mod auth;
pub mod comments;
pub mod common;
pub mod members;
pub mod middleware;
pub mod moderation;
pub mod notifications;
pub mod posts;
pub mod reports;
pub mod responses;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;

pub use middleware::{ApiError, AppState};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState, config: &Config) -> Router<AppState> {
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/members", members::router())
        .nest("/admin", admin::router())
        .nest("/moderation", moderation::router())
        .nest("/reports", reports::router())
        .nest("/notifications", notifications::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(attachments::router(config.upload.max_file_size))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .merge(protected_routes)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(origin, "Invalid CORS origin, allowing any origin");
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .nest("/api/v1", build_api_router(state.clone(), config))
        .merge(attachments::uploads_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.server.cors_origin)),
        )
        .with_state(state)
}
