//! Upload API endpoint
//!
//! - POST /upload/ - Upload one image in the multipart field `file`
//!
//! The body is streamed to disk and the upload is dropped as soon as it
//! passes the configured size.

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::UploadResponse;
use crate::services::upload::{PendingImage, UploadError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload/", post(upload_image))
        .layer(DefaultBodyLimit::disable())
}

/// POST /upload/
async fn upload_image(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        state.images.check_content_type(&content_type)?;

        let mut pending = state.images.begin(&filename, &content_type).await?;
        if let Err(e) = copy_field(&mut field, &mut pending).await {
            pending.abort().await;
            return Err(e);
        }

        let stored = pending.finish().await?;
        tracing::info!(user_id = user.id, filename = %stored.filename, "Image uploaded");
        return Ok(Json(stored.into()));
    }

    Err(UploadError::MissingFile.into())
}

async fn copy_field(field: &mut Field<'_>, pending: &mut PendingImage) -> Result<(), ApiError> {
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
    {
        pending.write_chunk(&chunk).await?;
    }
    Ok(())
}
