//! Image storage on the local filesystem
//!
//! Files are written below `upload.path` as `<uuid>.<ext>` and served back
//! read-only under `/uploads/...`.

use serde::Serialize;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::config::UploadConfig;

/// URL prefix uploaded files are served under
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type: {0}")]
    UnsupportedType(String),

    #[error("File too large. Maximum size: {0} bytes")]
    TooLarge(u64),

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored file as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

pub struct FileStore {
    config: UploadConfig,
}

impl FileStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.path
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Validate and write an upload, optionally into a subdirectory
    pub async fn store(&self, subdir: Option<&str>, content_type: &str, data: &[u8]) -> Result<StoredFile, UploadError> {
        if !self.config.is_type_allowed(content_type) {
            return Err(UploadError::UnsupportedType(content_type.to_string()));
        }
        if data.len() as u64 > self.config.max_file_size {
            return Err(UploadError::TooLarge(self.config.max_file_size));
        }

        let dir = match subdir {
            Some(sub) => self.config.path.join(sub),
            None => self.config.path.clone(),
        };
        fs::create_dir_all(&dir).await?;

        let filename = format!("{}.{}", Uuid::new_v4(), self.config.get_extension(content_type));
        fs::write(dir.join(&filename), data).await?;

        let url = match subdir {
            Some(sub) => format!("{}/{}/{}", UPLOADS_URL_PREFIX, sub, filename),
            None => format!("{}/{}", UPLOADS_URL_PREFIX, filename),
        };
        tracing::debug!("Stored upload {} ({} bytes)", url, data.len());

        Ok(StoredFile {
            url,
            filename,
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    /// Remove a previously stored file by its URL; unknown URLs are ignored
    pub async fn remove(&self, url: &str) {
        let Some(relative) = url.strip_prefix(UPLOADS_URL_PREFIX).map(|r| r.trim_start_matches('/')) else {
            return;
        };
        if relative.is_empty() || relative.split('/').any(|part| part == "..") {
            return;
        }
        if let Err(e) = fs::remove_file(self.config.path.join(relative)).await {
            tracing::warn!("Failed to remove upload {}: {}", url, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::new(UploadConfig {
            path: dir.path().to_path_buf(),
            max_file_size: 16,
            ..UploadConfig::default()
        })
    }

    #[tokio::test]
    async fn test_store_writes_uuid_named_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let stored = store.store(Some("subjects"), "image/png", b"png-bytes").await.unwrap();

        assert!(stored.filename.ends_with(".png"));
        assert_eq!(stored.url, format!("/uploads/subjects/{}", stored.filename));
        assert_eq!(stored.size, 9);
        let written = std::fs::read(dir.path().join("subjects").join(&stored.filename)).unwrap();
        assert_eq!(written, b"png-bytes");
    }

    #[tokio::test]
    async fn test_store_rejects_type_and_size() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(matches!(
            store.store(None, "image/gif", b"gif").await,
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            store.store(None, "image/jpeg", &[0u8; 17]).await,
            Err(UploadError::TooLarge(16))
        ));
    }

    #[tokio::test]
    async fn test_remove_ignores_paths_outside_root() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let stored = store.store(None, "image/jpeg", b"jpg").await.unwrap();

        store.remove("/uploads/../secret").await;
        store.remove(&stored.url).await;

        assert!(!dir.path().join(&stored.filename).exists());
    }
}
