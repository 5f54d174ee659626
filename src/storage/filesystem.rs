use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::fs;
use tokio_util::io::ReaderStream;

use std::{io, path::PathBuf};

use super::{BlobInfo, BlobStore, BlobStream, StorageError, UploadedFile, is_valid_key, new_key};

/// Stores every blob as a flat file named by its key under `root`.
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FilesystemStore {
    async fn upload(&self, file: &UploadedFile) -> Result<String, StorageError> {
        fs::create_dir_all(&self.root).await?;

        let key = new_key();
        let size = fs::copy(&file.path, self.blob_path(&key)).await?;
        tracing::debug!("Stored blob {key} ({size} bytes) in {}", self.root.display());

        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if !is_valid_key(key) {
            return Ok(());
        }

        match fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_stream(&self, key: &str) -> Result<Option<BlobStream>, StorageError> {
        if !is_valid_key(key) {
            return Ok(None);
        }

        match fs::File::open(self.blob_path(key)).await {
            Ok(file) => Ok(Some(ReaderStream::new(file).boxed())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut blobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(key) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_valid_key(&key) {
                continue;
            }
            blobs.push(BlobInfo {
                key,
                modified: DateTime::<Utc>::from(metadata.modified()?),
            });
        }

        Ok(blobs)
    }
}
