//! Blog post API endpoints
//!
//! - POST /blogs/ - Create a post authored by the caller
//! - GET /blogs/ - List and search posts
//! - GET /blogs/{id} - Get a post
//! - PUT /blogs/{id} - Partially update a post
//! - DELETE /blogs/{id} - Delete a post

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer};

use crate::api::clients::default_limit;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{MessageResponse, PostResponse};
use crate::models::{CreatePostInput, ListParams, Post, PostFilter, PostPatch, PostStatus};

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub client_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub category: Option<String>,
    pub featured_image: Option<String>,
    pub meta_description: Option<String>,
    pub slug: String,
    pub status: Option<String>,
}

impl TryFrom<CreatePostRequest> for CreatePostInput {
    type Error = ApiError;

    fn try_from(req: CreatePostRequest) -> Result<Self, Self::Error> {
        Ok(CreatePostInput {
            client_id: req.client_id,
            title: req.title,
            content: req.content,
            tags: req.tags,
            category: req.category,
            featured_image: req.featured_image,
            meta_description: req.meta_description,
            slug: req.slug,
            status: req.status.as_deref().map(parse_status).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub client_id: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Partial update body.
///
/// The outer `Option` records whether a field was sent at all, the inner one
/// whether it was `null`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub content: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub tags: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub featured_image: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub meta_description: Option<Option<String>>,
}

/// Any present value, including `null`, becomes `Some`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

impl TryFrom<UpdatePostRequest> for PostPatch {
    type Error = ApiError;

    fn try_from(req: UpdatePostRequest) -> Result<Self, Self::Error> {
        Ok(PostPatch {
            title: required("title", req.title)?,
            content: required("content", req.content)?,
            slug: required("slug", req.slug)?,
            status: required("status", req.status)?
                .as_deref()
                .map(parse_status)
                .transpose()?,
            tags: req.tags,
            category: req.category,
            featured_image: req.featured_image,
            meta_description: req.meta_description,
        })
    }
}

/// Non-nullable fields may be omitted but not set to `null`.
fn required(field: &str, value: Option<Option<String>>) -> Result<Option<String>, ApiError> {
    match value {
        Some(None) => Err(ApiError::with_details(
            "BAD_REQUEST",
            format!("Field '{}' cannot be null", field),
            serde_json::json!({ "field": field }),
        )),
        Some(Some(v)) => Ok(Some(v)),
        None => Ok(None),
    }
}

fn parse_status(value: &str) -> Result<PostStatus, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid status '{}': expected draft or published", value)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blogs/", get(list_posts).post(create_post))
        .route(
            "/blogs/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}

/// POST /blogs/
async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.create(&user, req.try_into()?).await?;
    detailed(&state, post).await
}

/// GET /blogs/
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let filter = PostFilter {
        client_id: query.client_id,
        status: query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(parse_status)
            .transpose()?,
        search: query.search.filter(|s| !s.is_empty()),
    };
    let params = ListParams::new(query.skip, query.limit);

    let posts = state.post_service.list(&filter, params).await?;
    let details = state.post_service.with_relations(posts).await?;

    Ok(Json(details.into_iter().map(Into::into).collect()))
}

/// GET /blogs/{id}
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get(id).await?;
    detailed(&state, post).await
}

/// PUT /blogs/{id}
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.update(id, req.try_into()?).await?;
    detailed(&state, post).await
}

/// DELETE /blogs/{id}
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.post_service.delete(id).await?;
    Ok(Json(MessageResponse::new("Blog post deleted successfully")))
}

/// Respond with a single post and its relations.
async fn detailed(state: &AppState, post: Post) -> Result<Json<PostResponse>, ApiError> {
    let details = state.post_service.with_relations(vec![post]).await?;
    details
        .into_iter()
        .next()
        .map(|d| Json(d.into()))
        .ok_or_else(|| ApiError::not_found("Blog post not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(body: &str) -> Result<PostPatch, ApiError> {
        serde_json::from_str::<UpdatePostRequest>(body).unwrap().try_into()
    }

    #[test]
    fn test_absent_fields_stay_unset() {
        let patch = patch(r#"{"status": "published"}"#).unwrap();
        assert_eq!(patch, PostPatch::new().with_status(PostStatus::Published));
    }

    #[test]
    fn test_null_clears_nullable_field() {
        let patch = patch(r#"{"tags": null}"#).unwrap();
        assert_eq!(patch.tags, Some(None));
        assert_eq!(patch.category, None);
    }

    #[test]
    fn test_null_rejected_for_required_field() {
        let err = patch(r#"{"title": null}"#).unwrap_err();
        assert_eq!(err.error.code, "BAD_REQUEST");
        assert_eq!(err.error.details, Some(serde_json::json!({"field": "title"})));

        assert!(patch(r#"{"status": null}"#).is_err());
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(patch(r#"{"status": "archived"}"#).is_err());
        assert!(parse_status("PUBLISHED").is_ok());
    }

    #[test]
    fn test_empty_body_is_empty_patch() {
        assert!(patch("{}").unwrap().is_empty());
    }
}
