//! Client model
//!
//! A client is a tenant: an organization identified by its domain that owns a
//! set of blog posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    /// Display name
    pub name: String,
    /// Domain (unique)
    pub domain: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: String, domain: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            name,
            domain,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating a new client
#[derive(Debug, Clone)]
pub struct CreateClientInput {
    pub name: String,
    pub domain: String,
}
