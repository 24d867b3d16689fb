//! Client service

use crate::db::is_unique_violation;
use crate::db::repositories::ClientRepository;
use crate::models::{Client, CreateClientInput, ListParams};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ClientServiceError {
    #[error("Client not found")]
    NotFound,

    #[error("Domain already registered")]
    DomainExists,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ClientService {
    repo: Arc<dyn ClientRepository>,
}

impl ClientService {
    pub fn new(repo: Arc<dyn ClientRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: CreateClientInput) -> Result<Client, ClientServiceError> {
        let name = input.name.trim();
        let domain = input.domain.trim();
        if name.is_empty() {
            return Err(ClientServiceError::ValidationError(
                "Name cannot be empty".to_string(),
            ));
        }
        if domain.is_empty() {
            return Err(ClientServiceError::ValidationError(
                "Domain cannot be empty".to_string(),
            ));
        }

        if self
            .repo
            .get_by_domain(domain)
            .await
            .context("Failed to check domain")?
            .is_some()
        {
            return Err(ClientServiceError::DomainExists);
        }

        let client = Client::new(name.to_string(), domain.to_string());
        let created = self.repo.create(&client).await.map_err(|e| {
            if is_unique_violation(&e) {
                ClientServiceError::DomainExists
            } else {
                ClientServiceError::InternalError(e)
            }
        })?;

        tracing::info!(client_id = created.id, domain = %created.domain, "Client created");
        Ok(created)
    }

    pub async fn list(&self, params: ListParams) -> Result<Vec<Client>, ClientServiceError> {
        Ok(self.repo.list(params).await.context("Failed to list clients")?)
    }

    /// Fetch a client or fail with `NotFound`.
    pub async fn get(&self, id: i64) -> Result<Client, ClientServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get client")?
            .ok_or(ClientServiceError::NotFound)
    }
}
