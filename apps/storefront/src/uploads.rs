//! Product image uploads.
//!
//! A product form arrives as `multipart/form-data`: text fields plus up to
//! `max_upload_files` parts named `images`. The form is read fully (and
//! bounded) before anything touches disk, so a request that fails
//! validation leaves no files behind.
//!
//! ```text
//! multipart ──► read_form() ──► validate fields ──► save_images()
//!                  │                                     │
//!                  ├── > max files   → 400               ├── {millis}-{name}
//!                  ├── > max bytes   → 413               └── /uploads/{file}
//!                  └── bad type      → 400
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use axum::extract::Multipart;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use jewel_core::validation::{sanitize_file_name, validate_image_upload};
use jewel_core::ValidationError;

use crate::error::{ApiError, ApiResult};

/// Multipart field carrying image files.
pub const IMAGES_FIELD: &str = "images";

/// URL prefix uploaded files are served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_file_bytes: usize,
    pub max_files: usize,
}

/// An image held in memory until the form is accepted.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A parsed multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub images: Vec<PendingImage>,
}

impl MultipartForm {
    /// Trimmed text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Required text field.
    pub fn required(&self, name: &str) -> Result<&str, ValidationError> {
        self.text(name).ok_or_else(|| ValidationError::Required {
            field: name.to_string(),
        })
    }
}

/// Reads every part of `multipart`, enforcing `limits`.
pub async fn read_form(mut multipart: Multipart, limits: UploadLimits) -> ApiResult<MultipartForm> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name != IMAGES_FIELD {
            let value = field.text().await?;
            form.fields.insert(name, value);
            continue;
        }

        let file_name = match field.file_name() {
            Some(f) if !f.trim().is_empty() => f.to_string(),
            // Browsers send an empty part when no file was picked
            _ => continue,
        };

        if form.images.len() >= limits.max_files {
            return Err(ApiError::bad_request(format!(
                "At most {} images per product",
                limits.max_files
            )));
        }

        let content_type = field.content_type().map(str::to_string);
        validate_image_upload(&file_name, content_type.as_deref())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > limits.max_file_bytes {
                warn!(file = %file_name, limit = limits.max_file_bytes, "Upload too large");
                return Err(ApiError::PayloadTooLarge {
                    limit: limits.max_file_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(file = %file_name, size = bytes.len(), "Image part received");
        form.images.push(PendingImage {
            file_name,
            content_type,
            bytes,
        });
    }

    Ok(form)
}

/// Writes images under `dir` and returns their public URLs, in order.
pub async fn save_images(dir: &Path, images: Vec<PendingImage>) -> ApiResult<Vec<String>> {
    if images.is_empty() {
        return Ok(Vec::new());
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::internal(format!("Cannot create uploads dir: {}", e)))?;

    let mut urls = Vec::with_capacity(images.len());
    for image in images {
        match write_unique(dir, &image).await {
            Ok(stored) => urls.push(format!("{}/{}", UPLOADS_URL_PREFIX, stored)),
            Err(e) => {
                discard_images(dir, &urls).await;
                return Err(e);
            }
        }
    }

    info!(count = urls.len(), "Images stored");
    Ok(urls)
}

/// Best-effort removal of files written by [`save_images`].
pub async fn discard_images(dir: &Path, urls: &[String]) {
    for url in urls {
        let Some(file) = url.strip_prefix(UPLOADS_URL_PREFIX).map(|f| f.trim_start_matches('/')) else {
            continue;
        };
        // Stored names are flat; anything else never came from save_images
        if file.is_empty() || file.contains(['/', '\\']) || file.starts_with('.') {
            warn!(url = %url, "Skipping removal of unexpected upload path");
            continue;
        }
        if let Err(e) = tokio::fs::remove_file(dir.join(file)).await {
            warn!(file = %file, error = %e, "Failed to remove upload");
        }
    }
}

/// Stores one image as `{unix_millis}-{sanitized name}`; a taken name moves
/// to the next millisecond.
async fn write_unique(dir: &Path, image: &PendingImage) -> ApiResult<String> {
    let safe_name = sanitize_file_name(&image.file_name);
    let mut millis = Utc::now().timestamp_millis();

    for _ in 0..64 {
        let stored = format!("{}-{}", millis, safe_name);
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&stored))
            .await;

        match opened {
            Ok(mut file) => {
                file.write_all(&image.bytes)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to write upload: {}", e)))?;
                file.flush()
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to write upload: {}", e)))?;
                return Ok(stored);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
            Err(e) => return Err(ApiError::internal(format!("Failed to create upload: {}", e))),
        }
    }

    Err(ApiError::internal(format!("No free file name for {}", safe_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str, bytes: &[u8]) -> PendingImage {
        PendingImage {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_save_images_names_and_urls() {
        let dir = tempfile::tempdir().unwrap();

        let urls = save_images(
            dir.path(),
            vec![image("../../etc/ring photo.png", b"a"), image("ring photo.png", b"b")],
        )
        .await
        .unwrap();

        assert_eq!(urls.len(), 2);
        assert_ne!(urls[0], urls[1]);
        for url in &urls {
            let file = url.strip_prefix("/uploads/").unwrap();
            assert!(file.ends_with("-ring_photo.png"), "{}", file);
            assert!(dir.path().join(file).is_file());
        }
    }

    #[tokio::test]
    async fn test_discard_removes_stored_files() {
        let dir = tempfile::tempdir().unwrap();
        let urls = save_images(dir.path(), vec![image("a.webp", b"x")]).await.unwrap();

        discard_images(dir.path(), &urls).await;

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_discard_ignores_paths_outside_uploads() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("uploads");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(root.path().join("keep.png"), b"x").unwrap();

        discard_images(
            &dir,
            &["/uploads/../keep.png".to_string(), "/uploads/..".to_string()],
        )
        .await;

        assert!(root.path().join("keep.png").is_file());
    }

    #[test]
    fn test_form_text_helpers() {
        let mut form = MultipartForm::default();
        form.fields.insert("name".to_string(), "  Jhumka ".to_string());
        form.fields.insert("description".to_string(), "   ".to_string());

        assert_eq!(form.text("name"), Some("Jhumka"));
        assert_eq!(form.text("description"), None);
        assert!(form.required("category").is_err());
    }
}
