mod filesystem;
mod http;
mod memory;

pub use filesystem::FilesystemStore;
pub use http::HttpObjectStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;

use std::{io, path::PathBuf};

use crate::config::StorageConfig;

pub type BlobStream = BoxStream<'static, Result<Bytes, io::Error>>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Blob store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Object store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Object store responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed to parse object listing: {0}")]
    Listing(#[from] quick_xml::DeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub key: String,
    pub modified: DateTime<Utc>,
}

/// A file received with a request, spooled to local disk until it is uploaded.
#[derive(Debug)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl UploadedFile {
    /// Removes the spooled copy. Failure is logged, never returned.
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(
                "Failed to remove temporary upload {}: {e}",
                self.path.display()
            );
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the file and returns the key it can be fetched by.
    async fn upload(&self, file: &UploadedFile) -> Result<String, StorageError>;

    /// Removes a blob. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Opens a blob for streaming, `None` if no such key exists.
    async fn read_stream(&self, key: &str) -> Result<Option<BlobStream>, StorageError>;

    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError>;
}

pub fn new_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Keys are generated by `new_key`; anything else never names a blob.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub fn from_config(config: &StorageConfig) -> Result<Box<dyn BlobStore>, StorageError> {
    Ok(match config {
        StorageConfig::Filesystem { root } => Box::new(FilesystemStore::new(root.clone())),
        StorageConfig::Http {
            base_url,
            bucket,
            auth_bearer,
        } => Box::new(HttpObjectStore::new(
            base_url,
            bucket,
            auth_bearer.clone(),
        )?),
        StorageConfig::Memory => Box::new(MemoryStore::default()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_valid() {
        let key = new_key();
        assert!(is_valid_key(&key));
        assert_ne!(key, new_key());
    }

    #[test]
    fn path_like_keys_are_rejected() {
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key("a/b"));
        assert!(!is_valid_key("key.png"));
        assert!(is_valid_key("3f2a-b_9"));
    }

    #[tokio::test]
    async fn discard_removes_spooled_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spooled");
        tokio::fs::write(&path, b"data").await.unwrap();

        let file = UploadedFile {
            path: path.clone(),
            file_name: None,
            content_type: None,
        };
        file.discard().await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn discard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedFile {
            path: dir.path().join("never-written"),
            file_name: None,
            content_type: None,
        };
        file.discard().await;
    }
}
