//! User API endpoints
//!
//! - POST /users/ - Register a user
//! - GET /users/me - Current user

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::UserResponse;
use crate::models::{CreateUserInput, UserRole};

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

impl TryFrom<CreateUserRequest> for CreateUserInput {
    type Error = ApiError;

    fn try_from(req: CreateUserRequest) -> Result<Self, Self::Error> {
        let role = req
            .role
            .map(|r| r.parse::<UserRole>())
            .transpose()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        Ok(CreateUserInput {
            username: req.username,
            email: req.email,
            password: req.password,
            role,
        })
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/users/", post(create_user))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/users/me", get(read_current_user))
}

/// POST /users/
async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.register(req.try_into()?).await?;
    Ok(Json(user.into()))
}

/// GET /users/me
async fn read_current_user(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Option<&str>) -> CreateUserRequest {
        CreateUserRequest {
            username: "ed".to_string(),
            email: "ed@example.com".to_string(),
            password: "pw".to_string(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn test_role_parsing() {
        let input = CreateUserInput::try_from(request(None)).unwrap();
        assert_eq!(input.role, None);

        let input = CreateUserInput::try_from(request(Some("admin"))).unwrap();
        assert_eq!(input.role, Some(UserRole::Admin));

        let err = CreateUserInput::try_from(request(Some("owner"))).unwrap_err();
        assert_eq!(err.error.code, "BAD_REQUEST");
    }
}
