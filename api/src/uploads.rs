//! Image storage on the local filesystem, served back under a public URL
//! prefix.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

pub const MAX_UPLOAD_BYTES: usize = 6 * 1024 * 1024;
pub const DEFAULT_FOLDER: &str = "profiles";

/// Accepted content types and the extension stored files get
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, relative: &Path) -> ApiResult<PathBuf> {
    let mut resolved = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return Err(ApiError::BadRequest("Path traversal detected".to_string())),
        }
    }
    if resolved == base || !resolved.starts_with(base) {
        return Err(ApiError::BadRequest("Path traversal detected".to_string()));
    }
    Ok(resolved)
}

/// Keep only `[A-Za-z0-9_-]` path segments; empty input means the default
/// folder.
fn sanitize_folder(folder: Option<&str>) -> String {
    let cleaned: Vec<String> = folder
        .unwrap_or(DEFAULT_FOLDER)
        .split('/')
        .map(|segment| {
            segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    if cleaned.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        cleaned.join("/")
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(content_type))
        .map(|(_, ext)| *ext)
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
    public_base_url: String,
    max_size: usize,
}

impl UploadStore {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_base_url: &str,
        max_size: usize,
    ) -> ApiResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ApiError::InternalError(format!(
                "Failed to create upload directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Upload store initialized");

        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Store an image and return its public URL
    pub async fn store_image(
        &self,
        folder: Option<&str>,
        content_type: &str,
        data: &[u8],
    ) -> ApiResult<String> {
        let Some(extension) = extension_for(content_type) else {
            return Err(ApiError::BadRequest(
                "Only image files are allowed".to_string(),
            ));
        };
        if data.is_empty() {
            return Err(ApiError::BadRequest("file is required".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ApiError::BadRequest(format!(
                "File too large (max {}MB)",
                self.max_size / (1024 * 1024)
            )));
        }

        let folder = sanitize_folder(folder);
        let file_name = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        );
        let relative = format!("{}/{}", folder, file_name);
        let path = ensure_within(&self.base_path, Path::new(&relative))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ApiError::InternalError(format!("Failed to create folder {}: {}", folder, e))
            })?;
        }
        fs::write(&path, data).await.map_err(|e| {
            ApiError::InternalError(format!("Failed to write upload {}: {}", relative, e))
        })?;

        debug!(path = %relative, size = data.len(), "Stored upload");
        Ok(format!("{}/{}", self.public_base_url, relative))
    }

    /// Remove a previously stored image by its public URL.
    ///
    /// Returns `false` when the URL is not one of ours or the file is already
    /// gone.
    pub async fn remove_by_url(&self, url: &str) -> ApiResult<bool> {
        let Some(relative) = url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Ok(false);
        };

        let path = ensure_within(&self.base_path, Path::new(relative))?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %relative, "Removed upload");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ApiError::InternalError(format!(
                "Failed to remove upload {}: {}",
                relative, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store(dir: &TempDir) -> UploadStore {
        UploadStore::new(dir.path().join("uploads"), "/uploads/", MAX_UPLOAD_BYTES)
            .await
            .unwrap()
    }

    #[test]
    fn test_sanitize_folder() {
        assert_eq!(sanitize_folder(None), "profiles");
        assert_eq!(sanitize_folder(Some("")), "profiles");
        assert_eq!(sanitize_folder(Some("comments")), "comments");
        assert_eq!(sanitize_folder(Some("../../etc")), "etc");
        assert_eq!(sanitize_folder(Some("a/./b c")), "a/bc");
    }

    #[test]
    fn test_ensure_within_rejects_parent_dir() {
        let base = Path::new("/srv/uploads");
        assert!(ensure_within(base, Path::new("a/b.png")).is_ok());
        assert!(ensure_within(base, Path::new("../secret")).is_err());
        assert!(ensure_within(base, Path::new("/etc/passwd")).is_err());
        assert!(ensure_within(base, Path::new("")).is_err());
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let url = store
            .store_image(Some("comments"), "image/png", b"\x89PNG fake")
            .await
            .unwrap();
        assert!(url.starts_with("/uploads/comments/"));
        assert!(url.ends_with(".png"));

        let relative = url.trim_start_matches("/uploads/");
        assert!(store.base_path().join(relative).exists());

        assert!(store.remove_by_url(&url).await.unwrap());
        assert!(!store.remove_by_url(&url).await.unwrap());
        assert!(!store.remove_by_url("https://elsewhere/x.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_bad_uploads() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let err = store.store_image(None, "text/plain", b"hi").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = store.store_image(None, "image/gif", b"").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let big = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let err = store.store_image(None, "image/jpeg", &big).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_remove_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        assert!(store.remove_by_url("/uploads/../outside.png").await.is_err());
    }
}
