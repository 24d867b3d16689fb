//! Client repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Client, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Client (tenant) data access
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Insert a client. A duplicate domain surfaces as a unique constraint
    /// violation in the error chain.
    async fn create(&self, client: &Client) -> Result<Client>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Client>>;

    async fn get_by_domain(&self, domain: &str) -> Result<Option<Client>>;

    /// List clients in ascending id order
    async fn list(&self, params: ListParams) -> Result<Vec<Client>>;
}

pub struct SqlxClientRepository {
    pool: DynDatabasePool,
}

impl SqlxClientRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ClientRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ClientRepository for SqlxClientRepository {
    async fn create(&self, client: &Client) -> Result<Client> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_client_sqlite(self.pool.sqlite()?, client).await,
            DatabaseDriver::Mysql => create_client_mysql(self.pool.mysql()?, client).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Client>> {
        let sql = "SELECT id, name, domain, created_at FROM clients WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get client by ID")?;
                row.as_ref().map(row_to_client_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get client by ID")?;
                row.as_ref().map(row_to_client_mysql).transpose()
            }
        }
    }

    async fn get_by_domain(&self, domain: &str) -> Result<Option<Client>> {
        let sql = "SELECT id, name, domain, created_at FROM clients WHERE domain = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(domain)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get client by domain")?;
                row.as_ref().map(row_to_client_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(domain)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get client by domain")?;
                row.as_ref().map(row_to_client_mysql).transpose()
            }
        }
    }

    async fn list(&self, params: ListParams) -> Result<Vec<Client>> {
        let sql = "SELECT id, name, domain, created_at FROM clients ORDER BY id ASC LIMIT ? OFFSET ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(params.limit)
                    .bind(params.skip)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list clients")?;
                rows.iter().map(row_to_client_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(params.limit)
                    .bind(params.skip)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list clients")?;
                rows.iter().map(row_to_client_mysql).collect()
            }
        }
    }
}

async fn create_client_sqlite(pool: &SqlitePool, client: &Client) -> Result<Client> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO clients (name, domain, created_at) VALUES (?, ?, ?)")
        .bind(&client.name)
        .bind(&client.domain)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create client")?;

    Ok(Client {
        id: result.last_insert_rowid(),
        name: client.name.clone(),
        domain: client.domain.clone(),
        created_at: now,
    })
}

async fn create_client_mysql(pool: &MySqlPool, client: &Client) -> Result<Client> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO clients (name, domain, created_at) VALUES (?, ?, ?)")
        .bind(&client.name)
        .bind(&client.domain)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create client")?;

    Ok(Client {
        id: result.last_insert_id() as i64,
        name: client.name.clone(),
        domain: client.domain.clone(),
        created_at: now,
    })
}

fn row_to_client_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Client> {
    Ok(Client {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        domain: row.try_get("domain")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_client_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Client> {
    Ok(Client {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        domain: row.try_get("domain")?,
        created_at: row.try_get("created_at")?,
    })
}
