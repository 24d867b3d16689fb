//! API middleware
//!
//! Contains the shared application state, the JSON error type and bearer
//! token authentication for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{SqlxClientRepository, SqlxPostRepository, SqlxUserRepository};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    ClientService, ClientServiceError, ImageStore, PostService, PostServiceError, TokenError,
    TokenService, UploadError, UserService, UserServiceError,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub client_service: Arc<ClientService>,
    pub post_service: Arc<PostService>,
    pub tokens: Arc<TokenService>,
    pub images: Arc<ImageStore>,
}

impl AppState {
    /// Wire repositories and services over `pool`.
    pub fn new(pool: DynDatabasePool, config: Config) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let clients = SqlxClientRepository::boxed(pool.clone());
        let posts = SqlxPostRepository::boxed(pool.clone());

        Self {
            user_service: Arc::new(UserService::new(users.clone())),
            client_service: Arc::new(ClientService::new(clients.clone())),
            post_service: Arc::new(PostService::new(posts, clients, users)),
            tokens: Arc::new(TokenService::new(
                &config.auth.secret_key,
                config.auth.token_expire_minutes,
            )),
            images: Arc::new(ImageStore::new(&config.upload)),
            config: Arc::new(config),
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

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

    /// Duplicate username, email, domain or slug
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" | "BAD_REQUEST" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::bad_request(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<ClientServiceError> for ApiError {
    fn from(err: ClientServiceError) -> Self {
        match err {
            ClientServiceError::NotFound => ApiError::not_found("Client not found"),
            ClientServiceError::DomainExists => ApiError::conflict("Domain already registered"),
            ClientServiceError::ValidationError(msg) => ApiError::bad_request(msg),
            ClientServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::NotFound => ApiError::not_found("Blog post not found"),
            PostServiceError::ClientNotFound => ApiError::not_found("Client not found"),
            PostServiceError::SlugExists => ApiError::conflict("Slug already exists"),
            PostServiceError::ValidationError(msg) => ApiError::bad_request(msg),
            PostServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(e) => {
                tracing::error!(error = %e, "Failed to store upload");
                ApiError::internal_error("Failed to store file")
            }
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(e) => {
                tracing::error!(error = %e, "Failed to sign token");
                ApiError::internal_error("Failed to issue token")
            }
            TokenError::LifetimeOutOfRange => {
                tracing::error!("Configured token lifetime overflows the clock");
                ApiError::internal_error("Failed to issue token")
            }
            TokenError::Expired | TokenError::Invalid => {
                ApiError::unauthorized("Could not validate credentials")
            }
        }
    }
}

/// Log the cause and hide it from the caller.
fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = ?err, "Request failed");
    ApiError::internal_error("Internal server error")
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
///
/// Verifies the token and resolves it to an active user, which is stored in
/// the request extensions for [`AuthenticatedUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let claims = state.tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::from(e)
    })?;
    let user = state.user_service.resolve_claims(&claims).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Fail with 403 unless the caller is an admin
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }
    Ok(())
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}
