//! Blog post repository
//!
//! Listing uses one static statement per backend with `(? IS NULL OR ..)`
//! guards, so absent filters simply bind NULL.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Post, PostFilter, PostStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Blog post data access
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post. A duplicate slug surfaces as a unique constraint
    /// violation in the error chain.
    async fn create(&self, post: &Post) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// List posts matching every supplied filter, in ascending id order
    async fn list(&self, filter: &PostFilter, params: ListParams) -> Result<Vec<Post>>;

    /// Persist every mutable column of `post` and stamp `updated_at`.
    /// Returns None if no row has the post's id.
    async fn update(&self, post: &Post) -> Result<Option<Post>>;

    /// Hard delete. Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str = "id, client_id, author_id, title, content, tags, category, \
     featured_image, meta_description, slug, status, created_at, updated_at";

const INSERT_POST: &str = r#"
    INSERT INTO blog_posts
        (client_id, author_id, title, content, tags, category, featured_image,
         meta_description, slug, status, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_POST: &str = r#"
    UPDATE blog_posts
    SET title = ?, content = ?, tags = ?, category = ?, featured_image = ?,
        meta_description = ?, slug = ?, status = ?, updated_at = ?
    WHERE id = ?
"#;

/// Escape LIKE metacharacters so `term` matches literally, and wrap it for a
/// substring match. The escape character is `\`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn list_sql(escape_literal: &str) -> String {
    format!(
        r#"
        SELECT {columns}
        FROM blog_posts
        WHERE (? IS NULL OR client_id = ?)
          AND (? IS NULL OR status = ?)
          AND (? IS NULL
               OR title LIKE ? ESCAPE {esc}
               OR content LIKE ? ESCAPE {esc}
               OR tags LIKE ? ESCAPE {esc})
        ORDER BY id ASC
        LIMIT ? OFFSET ?
        "#,
        columns = POST_COLUMNS,
        esc = escape_literal,
    )
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.sqlite()?, post).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.mysql()?, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM blog_posts WHERE id = ?", POST_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get post by ID")?;
                row.as_ref().map(row_to_post_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get post by ID")?;
                row.as_ref().map(row_to_post_mysql).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM blog_posts WHERE slug = ?", POST_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get post by slug")?;
                row.as_ref().map(row_to_post_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get post by slug")?;
                row.as_ref().map(row_to_post_mysql).transpose()
            }
        }
    }

    async fn list(&self, filter: &PostFilter, params: ListParams) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(self.pool.sqlite()?, filter, params).await,
            DatabaseDriver::Mysql => list_posts_mysql(self.pool.mysql()?, filter, params).await,
        }
    }

    async fn update(&self, post: &Post) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(self.pool.sqlite()?, post).await,
            DatabaseDriver::Mysql => update_post_mysql(self.pool.mysql()?, post).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM blog_posts WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_POST)
        .bind(post.client_id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.tags)
        .bind(&post.category)
        .bind(&post.featured_image)
        .bind(&post.meta_description)
        .bind(&post.slug)
        .bind(post.status.to_string())
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: None,
        ..post.clone()
    })
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    filter: &PostFilter,
    params: ListParams,
) -> Result<Vec<Post>> {
    let status = filter.status.map(|s| s.to_string());
    let pattern = filter.search.as_deref().map(like_pattern);

    let rows = sqlx::query(&list_sql(r"'\'"))
        .bind(filter.client_id)
        .bind(filter.client_id)
        .bind(&status)
        .bind(&status)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit)
        .bind(params.skip)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn update_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Option<Post>> {
    let now = Utc::now();

    let affected = sqlx::query(UPDATE_POST)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.tags)
        .bind(&post.category)
        .bind(&post.featured_image)
        .bind(&post.meta_description)
        .bind(&post.slug)
        .bind(post.status.to_string())
        .bind(now)
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?
        .rows_affected();

    if affected == 0 {
        return Ok(None);
    }

    Ok(Some(Post {
        updated_at: Some(now),
        ..post.clone()
    }))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let status_str: String = row.try_get("status")?;
    let status = PostStatus::from_str(&status_str)
        .with_context(|| format!("Invalid post status in database: {}", status_str))?;

    Ok(Post {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        author_id: row.try_get("author_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        tags: row.try_get("tags")?,
        category: row.try_get("category")?,
        featured_image: row.try_get("featured_image")?,
        meta_description: row.try_get("meta_description")?,
        slug: row.try_get("slug")?,
        status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_POST)
        .bind(post.client_id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.tags)
        .bind(&post.category)
        .bind(&post.featured_image)
        .bind(&post.meta_description)
        .bind(&post.slug)
        .bind(post.status.to_string())
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: None,
        ..post.clone()
    })
}

async fn list_posts_mysql(
    pool: &MySqlPool,
    filter: &PostFilter,
    params: ListParams,
) -> Result<Vec<Post>> {
    let status = filter.status.map(|s| s.to_string());
    let pattern = filter.search.as_deref().map(like_pattern);

    // MySQL string literals treat `\` as an escape, so the literal is doubled.
    let rows = sqlx::query(&list_sql(r"'\\'"))
        .bind(filter.client_id)
        .bind(filter.client_id)
        .bind(&status)
        .bind(&status)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit)
        .bind(params.skip)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn update_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Option<Post>> {
    let now = Utc::now();

    let affected = sqlx::query(UPDATE_POST)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.tags)
        .bind(&post.category)
        .bind(&post.featured_image)
        .bind(&post.meta_description)
        .bind(&post.slug)
        .bind(post.status.to_string())
        .bind(now)
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?
        .rows_affected();

    if affected == 0 {
        return Ok(None);
    }

    Ok(Some(Post {
        updated_at: Some(now),
        ..post.clone()
    }))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let status_str: String = row.try_get("status")?;
    let status = PostStatus::from_str(&status_str)
        .with_context(|| format!("Invalid post status in database: {}", status_str))?;

    Ok(Post {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        author_id: row.try_get("author_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        tags: row.try_get("tags")?,
        category: row.try_get("category")?,
        featured_image: row.try_get("featured_image")?,
        meta_description: row.try_get("meta_description")?,
        slug: row.try_get("slug")?,
        status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ClientRepository, SqlxClientRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, is_unique_violation, migrations};
    use crate::models::{Client, User, UserRole};
    use proptest::prelude::*;

    struct Fixture {
        repo: SqlxPostRepository,
        client_a: i64,
        client_b: i64,
        author: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let author = users
            .create(&User::new(
                "ed".to_string(),
                "ed@example.com".to_string(),
                "hash".to_string(),
                UserRole::Editor,
            ))
            .await
            .unwrap();

        let clients = SqlxClientRepository::new(pool.clone());
        let a = clients
            .create(&Client::new("A".to_string(), "a.com".to_string()))
            .await
            .unwrap();
        let b = clients
            .create(&Client::new("B".to_string(), "b.com".to_string()))
            .await
            .unwrap();

        Fixture {
            repo: SqlxPostRepository::new(pool),
            client_a: a.id,
            client_b: b.id,
            author: author.id,
        }
    }

    fn post(fx: &Fixture, client_id: i64, slug: &str, title: &str) -> Post {
        Post {
            id: 0,
            client_id,
            author_id: fx.author,
            title: title.to_string(),
            content: "body".to_string(),
            tags: None,
            category: None,
            featured_image: None,
            meta_description: None,
            slug: slug.to_string(),
            status: PostStatus::Draft,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let fx = setup().await;

        let created = fx
            .repo
            .create(&post(&fx, fx.client_a, "hello", "Hello"))
            .await
            .unwrap();
        assert!(created.id > 0);

        let found = fx.repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.slug, "hello");
        assert_eq!(found.status, PostStatus::Draft);
        assert!(found.updated_at.is_none());

        let by_slug = fx.repo.get_by_slug("hello").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);
    }

    #[tokio::test]
    async fn test_slug_unique_across_clients() {
        let fx = setup().await;
        fx.repo
            .create(&post(&fx, fx.client_a, "same", "A"))
            .await
            .unwrap();

        let err = fx
            .repo
            .create(&post(&fx, fx.client_b, "same", "B"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_unknown_client_rejected_by_foreign_key() {
        let fx = setup().await;
        let err = fx.repo.create(&post(&fx, 999, "x", "X")).await.unwrap_err();
        assert!(crate::db::is_foreign_key_violation(&err));
    }

    #[tokio::test]
    async fn test_list_filters_are_conjunctive() {
        let fx = setup().await;

        let mut cats = post(&fx, fx.client_a, "cats", "All about cats");
        cats.status = PostStatus::Published;
        fx.repo.create(&cats).await.unwrap();

        let mut tagged = post(&fx, fx.client_b, "tagged", "Pets");
        tagged.tags = Some("dogs,cats".to_string());
        fx.repo.create(&tagged).await.unwrap();

        let mut in_body = post(&fx, fx.client_a, "body", "Other");
        in_body.content = "my cats are great".to_string();
        fx.repo.create(&in_body).await.unwrap();

        fx.repo
            .create(&post(&fx, fx.client_a, "none", "Nothing here"))
            .await
            .unwrap();

        let search = PostFilter {
            search: Some("cats".to_string()),
            ..Default::default()
        };
        let found = fx.repo.list(&search, ListParams::default()).await.unwrap();
        let slugs: Vec<_> = found.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["cats", "tagged", "body"]);

        let narrowed = PostFilter {
            client_id: Some(fx.client_a),
            status: Some(PostStatus::Draft),
            search: Some("cats".to_string()),
        };
        let found = fx.repo.list(&narrowed, ListParams::default()).await.unwrap();
        let slugs: Vec<_> = found.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["body"]);

        let all = fx
            .repo
            .list(&PostFilter::default(), ListParams::new(1, 2))
            .await
            .unwrap();
        let slugs: Vec<_> = all.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["tagged", "body"]);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let fx = setup().await;
        fx.repo
            .create(&post(&fx, fx.client_a, "pct", "100% cotton"))
            .await
            .unwrap();
        fx.repo
            .create(&post(&fx, fx.client_a, "plain", "1000 cotton"))
            .await
            .unwrap();

        let filter = PostFilter {
            search: Some("0%".to_string()),
            ..Default::default()
        };
        let found = fx.repo.list(&filter, ListParams::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "pct");

        let filter = PostFilter {
            search: Some("_".to_string()),
            ..Default::default()
        };
        assert!(fx
            .repo
            .list(&filter, ListParams::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_post() {
        let fx = setup().await;
        let mut created = fx
            .repo
            .create(&post(&fx, fx.client_a, "p", "Before"))
            .await
            .unwrap();

        created.title = "After".to_string();
        created.tags = Some("x".to_string());
        let updated = fx.repo.update(&created).await.unwrap().unwrap();
        assert!(updated.updated_at.is_some());

        let found = fx.repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "After");
        assert_eq!(found.tags.as_deref(), Some("x"));
        assert!(found.updated_at.is_some());

        assert!(fx.repo.delete(created.id).await.unwrap());
        assert!(!fx.repo.delete(created.id).await.unwrap());
        assert!(fx.repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_post_returns_none() {
        let fx = setup().await;
        let mut ghost = fx
            .repo
            .create(&post(&fx, fx.client_a, "ghost", "Ghost"))
            .await
            .unwrap();
        assert!(fx.repo.delete(ghost.id).await.unwrap());

        ghost.title = "Revived".to_string();
        assert!(fx.repo.update(&ghost).await.unwrap().is_none());
        assert!(fx.repo.get_by_id(ghost.id).await.unwrap().is_none());

        ghost.id = 4242;
        assert!(fx.repo.update(&ghost).await.unwrap().is_none());
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("cats"), "%cats%");
        assert_eq!(like_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }

    proptest! {
        #[test]
        fn like_pattern_has_no_bare_wildcards(term in ".*") {
            let pattern = like_pattern(&term);
            let inner = &pattern[1..pattern.len() - 1];

            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    let next = chars.next();
                    prop_assert!(matches!(next, Some('%' | '_' | '\\')));
                } else {
                    prop_assert!(c != '%' && c != '_');
                }
            }
        }
    }
}
