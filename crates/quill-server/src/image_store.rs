use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ApiError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(&canonical_base)
        .unwrap_or(target)
        .components()
    {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(ApiError::validation(
                    "INVALID_IMAGE_NAME",
                    "Path traversal detected",
                ));
            }
            _ => {} // RootDir, CurDir, Prefix — skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(ApiError::validation(
            "INVALID_IMAGE_NAME",
            "Path traversal detected",
        ));
    }
    Ok(resolved)
}

/// Sniff the image container from its magic bytes. Only formats the
/// frontend renders are accepted.
fn sniff_format(data: &[u8]) -> Option<(&'static str, &'static str)> {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(("png", "image/png"))
    } else if data.starts_with(b"\xff\xd8\xff") {
        Some(("jpg", "image/jpeg"))
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some(("gif", "image/gif"))
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(("webp", "image/webp"))
    } else {
        None
    }
}

fn content_type_for(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// On-disk store for uploaded post images. Files are written as
/// `<uuid>.<ext>` and served back by name, so the stored URL is the only
/// handle a client ever sees.
#[derive(Debug, Clone)]
pub struct ImageStore {
    base_path: PathBuf,
    max_size: usize,
}

impl ImageStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ApiError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ApiError::Internal(format!(
                "Failed to create upload directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Image store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Persist an uploaded image and return its public file name.
    pub async fn store_image(&self, data: &[u8]) -> Result<String, ApiError> {
        if data.is_empty() {
            return Err(ApiError::validation("IMAGE_REQUIRED", "Image file is empty"));
        }
        if data.len() > self.max_size {
            return Err(ApiError::validation(
                "IMAGE_TOO_LARGE",
                format!("Image exceeds the {} byte limit", self.max_size),
            ));
        }
        let Some((ext, _)) = sniff_format(data) else {
            return Err(ApiError::validation(
                "UNSUPPORTED_IMAGE",
                "Only PNG, JPEG, GIF, and WebP images are accepted",
            ));
        };

        let name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.safe_image_path(&name)?;

        fs::write(&path, data)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to write image {name}: {e}")))?;

        debug!(name = %name, size = data.len(), "Stored image");
        Ok(name)
    }

    /// Read a stored image back for serving, with its content type.
    pub async fn read_image(&self, name: &str) -> Result<(Vec<u8>, &'static str), ApiError> {
        let (stem, ext) = name
            .rsplit_once('.')
            .ok_or_else(|| ApiError::validation("INVALID_IMAGE_NAME", "Malformed image name"))?;
        let content_type = content_type_for(ext)
            .ok_or_else(|| ApiError::validation("INVALID_IMAGE_NAME", "Malformed image name"))?;
        if Uuid::parse_str(stem).is_err() {
            return Err(ApiError::validation(
                "INVALID_IMAGE_NAME",
                "Malformed image name",
            ));
        }

        let path = self.safe_image_path(name)?;
        if !path.exists() {
            return Err(ApiError::not_found("IMAGE_NOT_FOUND", "Image not found"));
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to read image {name}: {e}")))?;

        debug!(name = %name, size = data.len(), "Served image");
        Ok((data, content_type))
    }

    fn safe_image_path(&self, name: &str) -> Result<PathBuf, ApiError> {
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(ApiError::validation(
                "INVALID_IMAGE_NAME",
                "Path traversal detected",
            ));
        }
        let raw = self.base_path.join(name);
        ensure_within(&self.base_path, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n0000";

    async fn test_store() -> (ImageStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn store_and_read_back() {
        let (store, _dir) = test_store().await;

        let name = store.store_image(PNG).await.unwrap();
        assert!(name.ends_with(".png"));

        let (data, content_type) = store.read_image(&name).await.unwrap();
        assert_eq!(data, PNG);
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn format_is_sniffed_not_trusted() {
        let (store, _dir) = test_store().await;

        assert!(store.store_image(b"\xff\xd8\xff0000").await.unwrap().ends_with(".jpg"));
        assert!(store.store_image(b"GIF89a0000").await.unwrap().ends_with(".gif"));
        assert!(store.store_image(b"not an image").await.is_err());
        assert!(store.store_image(b"").await.is_err());
    }

    #[tokio::test]
    async fn oversized_image_rejected() {
        let (store, _dir) = test_store().await;
        let mut big = PNG.to_vec();
        big.resize(2048, 0);
        assert!(store.store_image(&big).await.is_err());
    }

    #[tokio::test]
    async fn traversal_names_rejected() {
        let (store, _dir) = test_store().await;
        assert!(store.read_image("../etc/passwd").await.is_err());
        assert!(store.read_image("..%2fetc").await.is_err());
        assert!(store.read_image("noextension").await.is_err());
    }

    #[tokio::test]
    async fn missing_image_not_found() {
        let (store, _dir) = test_store().await;
        let name = format!("{}.png", Uuid::new_v4());
        assert!(store.read_image(&name).await.is_err());
    }
}
