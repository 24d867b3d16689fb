//! Blog post service
//!
//! Create, list/search, update and delete posts. The author of a new post is
//! always the caller; the target client must exist.

use crate::db::repositories::{ClientRepository, PostRepository, UserRepository};
use crate::db::{is_foreign_key_violation, is_unique_violation};
use crate::models::{
    Client, CreatePostInput, ListParams, Post, PostFilter, PostPatch, User,
};
use anyhow::Context;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Blog post not found")]
    NotFound,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Slug already exists")]
    SlugExists,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A post together with its client and author, when they can be loaded.
#[derive(Debug, Clone)]
pub struct PostDetails {
    pub post: Post,
    pub client: Option<Client>,
    pub author: Option<User>,
}

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    client_repo: Arc<dyn ClientRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        client_repo: Arc<dyn ClientRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            post_repo,
            client_repo,
            user_repo,
        }
    }

    pub async fn create(&self, author: &User, input: CreatePostInput) -> Result<Post, PostServiceError> {
        require_non_empty("Title", &input.title)?;
        require_non_empty("Content", &input.content)?;
        require_non_empty("Slug", &input.slug)?;

        if self
            .client_repo
            .get_by_id(input.client_id)
            .await
            .context("Failed to check client")?
            .is_none()
        {
            return Err(PostServiceError::ClientNotFound);
        }

        if self
            .post_repo
            .get_by_slug(&input.slug)
            .await
            .context("Failed to check slug")?
            .is_some()
        {
            return Err(PostServiceError::SlugExists);
        }

        let post = Post {
            id: 0,
            client_id: input.client_id,
            author_id: author.id,
            title: input.title,
            content: input.content,
            tags: input.tags,
            category: input.category,
            featured_image: input.featured_image,
            meta_description: input.meta_description,
            slug: input.slug,
            status: input.status.unwrap_or_default(),
            created_at: Utc::now(),
            updated_at: None,
        };

        let created = self.post_repo.create(&post).await.map_err(map_write_error)?;
        tracing::info!(post_id = created.id, slug = %created.slug, author_id = author.id, "Post created");
        Ok(created)
    }

    pub async fn list(
        &self,
        filter: &PostFilter,
        params: ListParams,
    ) -> Result<Vec<Post>, PostServiceError> {
        Ok(self
            .post_repo
            .list(filter, params)
            .await
            .context("Failed to list posts")?)
    }

    pub async fn get(&self, id: i64) -> Result<Post, PostServiceError> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)
    }

    /// Apply a partial update. Fields absent from `patch` are untouched.
    pub async fn update(&self, id: i64, patch: PostPatch) -> Result<Post, PostServiceError> {
        let mut post = self.get(id).await?;

        if patch.is_empty() {
            return Ok(post);
        }

        if let Some(title) = &patch.title {
            require_non_empty("Title", title)?;
        }
        if let Some(content) = &patch.content {
            require_non_empty("Content", content)?;
        }
        if let Some(slug) = &patch.slug {
            require_non_empty("Slug", slug)?;
            if let Some(existing) = self
                .post_repo
                .get_by_slug(slug)
                .await
                .context("Failed to check slug")?
            {
                if existing.id != id {
                    return Err(PostServiceError::SlugExists);
                }
            }
        }

        patch.apply(&mut post);
        // The row can disappear between the read above and this write.
        let updated = self
            .post_repo
            .update(&post)
            .await
            .map_err(map_write_error)?
            .ok_or(PostServiceError::NotFound)?;
        tracing::debug!(post_id = id, "Post updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let deleted = self
            .post_repo
            .delete(id)
            .await
            .context("Failed to delete post")?;
        if !deleted {
            return Err(PostServiceError::NotFound);
        }
        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }

    /// Attach client and author records to each post. Lookups are shared
    /// across the batch.
    pub async fn with_relations(&self, posts: Vec<Post>) -> Result<Vec<PostDetails>, PostServiceError> {
        let mut clients: HashMap<i64, Option<Client>> = HashMap::new();
        let mut authors: HashMap<i64, Option<User>> = HashMap::new();
        let mut details = Vec::with_capacity(posts.len());

        for post in posts {
            if !clients.contains_key(&post.client_id) {
                let client = self
                    .client_repo
                    .get_by_id(post.client_id)
                    .await
                    .context("Failed to load post client")?;
                clients.insert(post.client_id, client);
            }
            if !authors.contains_key(&post.author_id) {
                let author = self
                    .user_repo
                    .get_by_id(post.author_id)
                    .await
                    .context("Failed to load post author")?;
                authors.insert(post.author_id, author);
            }

            details.push(PostDetails {
                client: clients.get(&post.client_id).cloned().flatten(),
                author: authors.get(&post.author_id).cloned().flatten(),
                post,
            });
        }

        Ok(details)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), PostServiceError> {
    if value.trim().is_empty() {
        return Err(PostServiceError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

fn map_write_error(e: anyhow::Error) -> PostServiceError {
    if is_unique_violation(&e) {
        PostServiceError::SlugExists
    } else if is_foreign_key_violation(&e) {
        PostServiceError::ClientNotFound
    } else {
        PostServiceError::InternalError(e)
    }
}
