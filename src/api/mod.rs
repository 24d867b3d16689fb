//! API layer - HTTP handlers and routing
//!
//! - `POST /token` and `POST /users/` are public
//! - every other endpoint requires a bearer token
//! - uploaded files are served from `/uploads/<filename>`

pub mod auth;
pub mod blogs;
pub mod clients;
pub mod middleware;
pub mod responses;
pub mod upload;
pub mod users;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::services::upload::UPLOADS_URL_PREFIX;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the API routes
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a valid bearer token)
    let protected_routes = Router::new()
        .merge(users::protected_router())
        .merge(clients::router())
        .merge(blogs::router())
        .merge(upload::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .merge(auth::router())
        .merge(users::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let origin = state
        .config
        .server
        .cors_origin
        .parse::<HeaderValue>()
        .context("Invalid CORS origin")?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let uploads = ServeDir::new(state.images.root());

    Ok(build_api_router(state.clone())
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
