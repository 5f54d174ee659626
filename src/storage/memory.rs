use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use tokio::sync::Mutex;

use std::{collections::HashMap, io};

use super::{BlobInfo, BlobStore, BlobStream, StorageError, UploadedFile, new_key};

/// Keeps blobs in process memory. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, (Bytes, DateTime<Utc>)>>,
}

impl MemoryStore {
    #[cfg(test)]
    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.lock().await.contains_key(key)
    }

    /// Inserts a blob directly, bypassing upload.
    pub async fn insert(&self, key: &str, bytes: impl Into<Bytes>, modified: DateTime<Utc>) {
        self.blobs
            .lock()
            .await
            .insert(key.to_string(), (bytes.into(), modified));
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn upload(&self, file: &UploadedFile) -> Result<String, StorageError> {
        let bytes = tokio::fs::read(&file.path).await?;
        let key = new_key();
        self.insert(&key, bytes, Utc::now()).await;
        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.blobs.lock().await.remove(key);
        Ok(())
    }

    async fn read_stream(&self, key: &str) -> Result<Option<BlobStream>, StorageError> {
        let blobs = self.blobs.lock().await;
        Ok(blobs.get(key).map(|(bytes, _)| {
            stream::once(std::future::ready(Ok::<_, io::Error>(bytes.clone()))).boxed()
        }))
    }

    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError> {
        Ok(self
            .blobs
            .lock()
            .await
            .iter()
            .map(|(key, (_, modified))| BlobInfo {
                key: key.clone(),
                modified: *modified,
            })
            .collect())
    }
}
