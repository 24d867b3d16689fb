//! Blog post model
//!
//! A post belongs to exactly one client and one author. Slugs are unique
//! across all clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub client_id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    /// Free-form tag list, usually comma separated
    pub tags: Option<String>,
    pub category: Option<String>,
    /// Upload reference (`/uploads/..`) or external URL
    pub featured_image: Option<String>,
    pub meta_description: Option<String>,
    /// URL-safe identifier (globally unique)
    pub slug: String,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Publication state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostStatus::Draft => write!(f, "draft"),
            PostStatus::Published => write!(f, "published"),
        }
    }
}

impl FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            _ => Err(anyhow::anyhow!("Invalid post status: {}", s)),
        }
    }
}

/// Input for creating a new post. The author is taken from the caller.
#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    pub client_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub category: Option<String>,
    pub featured_image: Option<String>,
    pub meta_description: Option<String>,
    pub slug: String,
    /// Defaults to draft
    pub status: Option<PostStatus>,
}

/// Partial update for a post.
///
/// `None` leaves a field untouched. For the nullable fields the inner option
/// distinguishes "set to this value" (`Some(Some(v))`) from "clear"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub slug: Option<String>,
    pub status: Option<PostStatus>,
    pub tags: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub featured_image: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
}

impl PostPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tags(mut self, tags: Option<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// True if the patch would change nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every supplied field to `post`.
    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(slug) = self.slug {
            post.slug = slug;
        }
        if let Some(status) = self.status {
            post.status = status;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(category) = self.category {
            post.category = category;
        }
        if let Some(featured_image) = self.featured_image {
            post.featured_image = featured_image;
        }
        if let Some(meta_description) = self.meta_description {
            post.meta_description = meta_description;
        }
    }
}

/// Conjunctive filter for listing posts. Absent fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub client_id: Option<i64>,
    pub status: Option<PostStatus>,
    /// Literal substring matched against title, content or tags
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_post() -> Post {
        Post {
            id: 1,
            client_id: 1,
            author_id: 1,
            title: "Hello".to_string(),
            content: "World".to_string(),
            tags: Some("a,b".to_string()),
            category: Some("news".to_string()),
            featured_image: None,
            meta_description: None,
            slug: "hello-world".to_string(),
            status: PostStatus::Draft,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_status_only_patch_leaves_other_fields() {
        let mut post = sample_post();
        let before = post.clone();

        PostPatch::new()
            .with_status(PostStatus::Published)
            .apply(&mut post);

        assert_eq!(post.status, PostStatus::Published);
        assert_eq!(post.title, before.title);
        assert_eq!(post.content, before.content);
        assert_eq!(post.slug, before.slug);
        assert_eq!(post.tags, before.tags);
        assert_eq!(post.category, before.category);
    }

    #[test]
    fn test_patch_clears_nullable_field() {
        let mut post = sample_post();

        PostPatch::new().with_tags(None).apply(&mut post);

        assert_eq!(post.tags, None);
        assert_eq!(post.category.as_deref(), Some("news"));
    }

    #[test]
    fn test_empty_patch() {
        assert!(PostPatch::new().is_empty());
        assert!(!PostPatch::new().with_tags(None).is_empty());
        assert!(!PostPatch::new().with_title("t").is_empty());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(PostStatus::from_str("draft").unwrap(), PostStatus::Draft);
        assert_eq!(
            PostStatus::from_str("Published").unwrap(),
            PostStatus::Published
        );
        assert!(PostStatus::from_str("archived").is_err());
        assert_eq!(PostStatus::default(), PostStatus::Draft);
    }

    proptest! {
        #[test]
        fn empty_patch_is_identity(title in ".*", content in ".*") {
            let mut post = sample_post();
            post.title = title;
            post.content = content;
            let before = post.clone();

            PostPatch::new().apply(&mut post);

            prop_assert_eq!(post, before);
        }

        #[test]
        fn unknown_statuses_rejected(s in "[a-z]{1,12}") {
            prop_assume!(s != "draft" && s != "published");
            prop_assert!(PostStatus::from_str(&s).is_err());
        }
    }
}
