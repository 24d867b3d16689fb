//! Client API endpoints
//!
//! - POST /clients/ - Create a client
//! - GET /clients/ - List clients
//! - GET /clients/{id} - Get a client

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{require_admin, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ClientResponse;
use crate::models::{CreateClientInput, ListParams};

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub domain: String,
}

/// Offset/limit query shared by list endpoints.
/// `limit` is capped at [`ListParams::MAX_LIMIT`].
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub(crate) fn default_limit() -> i64 {
    ListParams::DEFAULT_LIMIT
}

impl From<PageQuery> for ListParams {
    fn from(query: PageQuery) -> Self {
        ListParams::new(query.skip, query.limit)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients/", get(list_clients).post(create_client))
        .route("/clients/{id}", get(get_client))
}

/// POST /clients/
async fn create_client(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<CreateClientRequest>,
) -> Result<Json<ClientResponse>, ApiError> {
    if state.config.auth.admin_only_clients {
        require_admin(&user)?;
    }

    let client = state
        .client_service
        .create(CreateClientInput {
            name: req.name,
            domain: req.domain,
        })
        .await?;

    Ok(Json(client.into()))
}

/// GET /clients/
async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<ClientResponse>>, ApiError> {
    let clients = state.client_service.list(query.into()).await?;
    Ok(Json(clients.into_iter().map(Into::into).collect()))
}

/// GET /clients/{id}
async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ClientResponse>, ApiError> {
    let client = state.client_service.get(id).await?;
    Ok(Json(client.into()))
}
