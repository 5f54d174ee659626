use chrono::Utc;

use std::{collections::HashSet, sync::Arc, time::Duration};

use super::{NoteService, ServiceError};
use crate::config::ReconcileConfig;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Unreferenced blobs deleted from the store
    pub removed_blobs: usize,
    /// Notes whose image key pointed at a missing blob
    pub cleared_references: u64,
}

impl NoteService {
    /// Brings the blob store and the notes table back in agreement.
    ///
    /// Blobs no note references are deleted once older than `grace`, which
    /// keeps uploads whose note is still being written. Notes referencing a
    /// blob that no longer exists lose their image key. Notes written while
    /// this runs are left for the next pass.
    pub async fn reconcile(&self, grace: Duration) -> Result<ReconcileReport, ServiceError> {
        // References first: a key persisted after this read is absent from
        // `referenced` and so can never be cleared below.
        let referenced: HashSet<String> =
            self.repo.referenced_image_keys().await?.into_iter().collect();
        let blobs = self.store.list().await?;

        let cutoff = Utc::now()
            - chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::zero());
        let mut report = ReconcileReport::default();

        for blob in &blobs {
            if referenced.contains(&blob.key) || blob.modified > cutoff {
                continue;
            }
            match self.store.delete(&blob.key).await {
                Ok(()) => {
                    tracing::info!("Removed unreferenced blob {}", blob.key);
                    report.removed_blobs += 1;
                }
                Err(e) => tracing::warn!("Failed to remove unreferenced blob {}: {e}", blob.key),
            }
        }

        let stored: HashSet<&str> = blobs.iter().map(|b| b.key.as_str()).collect();
        for key in referenced.iter().filter(|k| !stored.contains(k.as_str())) {
            let cleared = self.repo.clear_image_key(key).await?;
            tracing::warn!("Blob {key} is missing, cleared it from {cleared} note(s)");
            report.cleared_references += cleared;
        }

        Ok(report)
    }
}

/// Runs reconciliation every `config.interval` for the life of the process.
pub fn spawn_reconciler(service: Arc<NoteService>, config: ReconcileConfig) {
    if !config.enabled {
        tracing::info!("Blob reconciliation disabled");
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.interval);
        loop {
            interval.tick().await;
            match service.reconcile(config.grace).await {
                Ok(report) => tracing::info!(
                    "Reconciliation finished: {} blob(s) removed, {} reference(s) cleared",
                    report.removed_blobs,
                    report.cleared_references
                ),
                Err(e) => tracing::error!("Reconciliation failed: {e}"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::{
        auth::Identity,
        dto::NoteForm,
        repository::{MemoryRepository, NoteRepository},
        storage::{BlobInfo, BlobStore, BlobStream, MemoryStore, StorageError, UploadedFile},
    };

    /// Finishes a note with a new image right after answering `list`, the way
    /// a request landing mid-reconcile would.
    struct CreateDuringList {
        inner: MemoryStore,
        repo: Arc<MemoryRepository>,
    }

    #[async_trait]
    impl BlobStore for CreateDuringList {
        async fn upload(&self, file: &UploadedFile) -> Result<String, StorageError> {
            self.inner.upload(file).await
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.inner.delete(key).await
        }

        async fn read_stream(&self, key: &str) -> Result<Option<BlobStream>, StorageError> {
            self.inner.read_stream(key).await
        }

        async fn list(&self) -> Result<Vec<BlobInfo>, StorageError> {
            let snapshot = self.inner.list().await?;

            self.inner.insert("freshkey", "just uploaded", Utc::now()).await;
            self.repo
                .insert_note("u", form().validate().unwrap(), Some("freshkey".to_string()))
                .await
                .unwrap();

            Ok(snapshot)
        }
    }

    fn identity() -> Identity {
        Identity {
            id: "u".to_string(),
            display_name: "U".to_string(),
        }
    }

    fn form() -> NoteForm {
        NoteForm {
            title: Some("t".to_string()),
            description: None,
            status: None,
            link: Some("https://example.org".to_string()),
            subject_code: Some("S".to_string()),
        }
    }

    #[tokio::test]
    async fn stale_orphans_are_removed_and_fresh_ones_kept() {
        let repo = Arc::new(MemoryRepository::default());
        let store = Arc::new(MemoryStore::default());
        let service = NoteService::new(repo.clone(), store.clone());

        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("img");
        tokio::fs::write(&path, b"referenced").await.unwrap();
        let note = service
            .create_note(
                &identity(),
                form(),
                Some(UploadedFile {
                    path,
                    file_name: None,
                    content_type: None,
                }),
            )
            .await
            .unwrap();
        let kept = note.image_key.unwrap();

        let old = Utc::now() - chrono::Duration::hours(2);
        store.insert(&kept, "referenced", old).await;
        store.insert("orphan", "lost", old).await;
        store.insert("inflight", "new", Utc::now()).await;

        let report = service.reconcile(Duration::from_secs(60)).await.unwrap();

        assert_eq!(report.removed_blobs, 1);
        assert!(store.contains(&kept).await);
        assert!(store.contains("inflight").await);
        assert!(!store.contains("orphan").await);
    }

    #[tokio::test]
    async fn references_to_missing_blobs_are_cleared() {
        let repo = Arc::new(MemoryRepository::default());
        let store = Arc::new(MemoryStore::default());
        let service = NoteService::new(repo.clone(), store.clone());

        repo.upsert_user(&identity().as_owner()).await.unwrap();
        let draft = form().validate().unwrap();
        let note = repo
            .insert_note("u", draft, Some("vanished".to_string()))
            .await
            .unwrap();

        let report = service.reconcile(Duration::from_secs(60)).await.unwrap();

        assert_eq!(report.cleared_references, 1);
        let stored = repo.find_note(note.id).await.unwrap().unwrap();
        assert_eq!(stored.image_key, None);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn note_written_during_reconcile_keeps_its_image() {
        let repo = Arc::new(MemoryRepository::default());
        repo.upsert_user(&identity().as_owner()).await.unwrap();
        let store = Arc::new(CreateDuringList {
            inner: MemoryStore::default(),
            repo: repo.clone(),
        });
        let service = NoteService::new(repo.clone(), store.clone());

        let report = service.reconcile(Duration::from_secs(60)).await.unwrap();

        assert_eq!(report, ReconcileReport::default());
        let notes = repo.list_by_owner("u").await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].image_key.as_deref(), Some("freshkey"));
        assert!(store.inner.contains("freshkey").await);

        let second = service.reconcile(Duration::from_secs(60)).await.unwrap();
        assert_eq!(second.removed_blobs, 0);
        assert_eq!(second.cleared_references, 0);
    }
}
