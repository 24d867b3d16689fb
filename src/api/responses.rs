//! Response bodies shared by the API handlers

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Client, Post, User};
use crate::services::{PostDetails, StoredImage};

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            domain: client.domain,
            created_at: client.created_at,
        }
    }
}

/// A blog post with its client and author embedded when available
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub client_id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub category: Option<String>,
    pub featured_image: Option<String>,
    pub meta_description: Option<String>,
    pub slug: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserResponse>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            client_id: post.client_id,
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            tags: post.tags,
            category: post.category,
            featured_image: post.featured_image,
            meta_description: post.meta_description,
            slug: post.slug,
            status: post.status.to_string(),
            created_at: post.created_at,
            updated_at: post.updated_at,
            client: None,
            author: None,
        }
    }
}

impl From<PostDetails> for PostResponse {
    fn from(details: PostDetails) -> Self {
        Self {
            client: details.client.map(Into::into),
            author: details.author.map(Into::into),
            ..Self::from(details.post)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
    pub message: &'static str,
}

impl From<StoredImage> for UploadResponse {
    fn from(image: StoredImage) -> Self {
        Self {
            filename: image.filename,
            url: image.url,
            size: image.size,
            content_type: image.content_type,
            message: "Image uploaded successfully",
        }
    }
}

/// Plain acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
