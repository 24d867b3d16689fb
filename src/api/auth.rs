//! Token endpoint
//!
//! - POST /token - Exchange username and password for a bearer token

use axum::{extract::State, routing::post, Form, Json, Router};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::TokenResponse;

/// OAuth2 password grant form. Other grant fields are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Build the token router
pub fn router() -> Router<AppState> {
    Router::new().route("/token", post(login))
}

/// POST /token
async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(&form.username, &form.password)
        .await?;

    let token = state.tokens.issue(&user)?;
    tracing::info!(user_id = user.id, "Issued access token");

    Ok(Json(TokenResponse::bearer(token)))
}
