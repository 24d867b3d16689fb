//! Image storage for uploads
//!
//! Files are written under the configured directory with the name
//! `YYYYmmdd_HHMMSS_<sanitized original name>` and served at
//! `/uploads/<name>`. Data is written as it arrives, and the write is
//! abandoned (and the partial file removed) as soon as it passes the size
//! limit.

use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::UploadConfig;

/// URL prefix stored files are served under
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

const MAX_NAME_LEN: usize = 100;
const NAME_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File type {0} is not allowed. Allowed types: jpeg, png, gif, webp")]
    UnsupportedType(String),

    #[error("File too large. Maximum size is {max} bytes")]
    TooLarge { max: u64 },

    #[error("No file provided")]
    MissingFile,

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file that has been fully written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

/// Writes uploaded images to local storage.
#[derive(Debug, Clone)]
pub struct ImageStore {
    config: UploadConfig,
}

impl ImageStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Directory files are stored in
    pub fn root(&self) -> &Path {
        &self.config.path
    }

    pub fn max_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Reject anything outside the allowed image types.
    pub fn check_content_type(&self, content_type: &str) -> Result<(), UploadError> {
        if self.config.is_type_allowed(content_type) {
            Ok(())
        } else {
            Err(UploadError::UnsupportedType(content_type.to_string()))
        }
    }

    /// Reserve a fresh file for an upload. The content type must already be
    /// checked.
    pub async fn begin(
        &self,
        original_name: &str,
        content_type: &str,
    ) -> Result<PendingImage, UploadError> {
        fs::create_dir_all(self.root()).await?;

        let base = stored_name(original_name, Utc::now());
        for attempt in 0..NAME_ATTEMPTS {
            let filename = if attempt == 0 {
                base.clone()
            } else {
                with_random_segment(&base)
            };
            let path = self.root().join(&filename);

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    return Ok(PendingImage {
                        file,
                        path,
                        filename,
                        content_type: content_type.to_string(),
                        written: 0,
                        max_size: self.max_size(),
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(UploadError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "could not find a free file name",
        )))
    }
}

/// An upload in progress. Call [`PendingImage::finish`] to keep it or
/// [`PendingImage::abort`] to remove it.
#[derive(Debug)]
pub struct PendingImage {
    file: fs::File,
    path: PathBuf,
    filename: String,
    content_type: String,
    written: u64,
    max_size: u64,
}

impl PendingImage {
    /// Append a chunk, failing once the total exceeds the size limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        let total = self.written + chunk.len() as u64;
        if total > self.max_size {
            return Err(UploadError::TooLarge {
                max: self.max_size,
            });
        }
        self.file.write_all(chunk).await?;
        self.written = total;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StoredImage, UploadError> {
        if let Err(e) = self.file.flush().await {
            self.abort().await;
            return Err(e.into());
        }

        tracing::info!(filename = %self.filename, size = self.written, "Image stored");
        Ok(StoredImage {
            url: format!("{}/{}", UPLOADS_URL_PREFIX, self.filename),
            filename: self.filename,
            size: self.written,
            content_type: self.content_type,
        })
    }

    /// Discard the partial file.
    pub async fn abort(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial upload");
        }
    }
}

/// `YYYYmmdd_HHMMSS_<sanitized>` for the given time.
pub fn stored_name(original_name: &str, now: chrono::DateTime<Utc>) -> String {
    format!(
        "{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        sanitize_filename(original_name)
    )
}

/// Insert a short random segment after the timestamp prefix.
fn with_random_segment(name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let token = &token[..8];
    // Prefix is `YYYYmmdd_HHMMSS_`, 16 ASCII bytes.
    match name.get(..16) {
        Some(prefix) => format!("{}{}_{}", prefix, token, &name[16..]),
        None => format!("{}_{}", token, name),
    }
}

/// Reduce a client-supplied name to a safe final path component.
///
/// Directory parts are dropped, characters outside `[A-Za-z0-9._-]` become
/// `_`, leading dots are stripped and the result is capped in length.
pub fn sanitize_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return "image".to_string();
    }

    if cleaned.len() <= MAX_NAME_LEN {
        return cleaned.to_string();
    }

    // Keep the extension when truncating.
    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if ext.len() < 10 => {
            let keep = MAX_NAME_LEN.saturating_sub(ext.len() + 1);
            format!("{}.{}", &stem[..keep.min(stem.len())], ext)
        }
        _ => cleaned[..MAX_NAME_LEN].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir, max: u64) -> ImageStore {
        let config = UploadConfig {
            path: dir.path().join("uploads"),
            max_file_size: max,
            ..UploadConfig::default()
        };
        ImageStore::new(&config)
    }

    async fn put(store: &ImageStore, name: &str, data: &[u8]) -> StoredImage {
        let mut pending = store.begin(name, "image/png").await.unwrap();
        pending.write_chunk(data).await.unwrap();
        pending.finish().await.unwrap()
    }

    #[test]
    fn test_stored_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(stored_name("cat.png", at), "20240309_140507_cat.png");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("cat.png"), "cat.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\Users\me\photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "image");
        assert_eq!(sanitize_filename("dir/"), "image");

        let long = format!("{}.png", "a".repeat(300));
        let cut = sanitize_filename(&long);
        assert_eq!(cut.len(), MAX_NAME_LEN);
        assert!(cut.ends_with(".png"));
    }

    #[test]
    fn test_random_segment_keeps_prefix() {
        let name = "20240309_140507_cat.png";
        let other = with_random_segment(name);
        assert!(other.starts_with("20240309_140507_"));
        assert!(other.ends_with("_cat.png"));
        assert_eq!(other.len(), name.len() + 9);
    }

    #[test]
    fn test_check_content_type() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 1024);

        assert!(store.check_content_type("image/png").is_ok());
        assert!(matches!(
            store.check_content_type("application/pdf"),
            Err(UploadError::UnsupportedType(_))
        ));
    }

    #[tokio::test]
    async fn test_store_writes_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 1024);

        let stored = put(&store, "cat.png", b"png").await;
        let stored_more = put(&store, "dog.png", b"pngdata").await;
        assert_eq!(stored_more.size, 7);

        assert!(stored.filename.ends_with("_cat.png"));
        assert_eq!(stored.url, format!("/uploads/{}", stored.filename));
        assert_eq!(stored.size, 3);
        assert_eq!(stored.content_type, "image/png");
        let on_disk = std::fs::read(store.root().join(&stored_more.filename)).unwrap();
        assert_eq!(on_disk, b"pngdata");
    }

    #[tokio::test]
    async fn test_same_name_same_second_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 1024);

        let first = put(&store, "cat.png", b"one").await;
        let second = put(&store, "cat.png", b"two").await;

        assert_ne!(first.filename, second.filename);
        assert_eq!(std::fs::read(store.root().join(&first.filename)).unwrap(), b"one");
        assert_eq!(std::fs::read(store.root().join(&second.filename)).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_oversized_chunks_leave_no_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 10);

        let mut pending = store.begin("big.png", "image/png").await.unwrap();
        pending.write_chunk(&[0u8; 6]).await.unwrap();
        let err = pending.write_chunk(&[0u8; 6]).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { max: 10 }));
        pending.abort().await;

        let leftovers = std::fs::read_dir(store.root()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_chunks_accumulate_up_to_limit() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 4);

        let mut pending = store.begin("a.png", "image/png").await.unwrap();
        pending.write_chunk(b"12").await.unwrap();
        pending.write_chunk(b"34").await.unwrap();
        assert!(matches!(
            pending.write_chunk(b"5").await,
            Err(UploadError::TooLarge { max: 4 })
        ));
        let stored = pending.finish().await.unwrap();

        assert_eq!(stored.size, 4);
        assert_eq!(std::fs::read(store.root().join(&stored.filename)).unwrap(), b"1234");
    }

    proptest! {
        #[test]
        fn sanitized_names_are_safe(name in ".*") {
            let clean = sanitize_filename(&name);

            prop_assert!(!clean.is_empty());
            prop_assert!(clean.len() <= MAX_NAME_LEN);
            prop_assert!(!clean.starts_with('.'));
            prop_assert!(clean
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
        }
    }
}
