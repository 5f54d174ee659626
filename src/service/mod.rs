mod reconcile;

pub use reconcile::spawn_reconciler;

use std::sync::Arc;

use crate::{
    auth::Identity,
    dto::{NoteForm, ValidationError},
    models::{Note, NoteStatus, NoteWithOwner},
    repository::{NoteRepository, RepositoryError},
    storage::{BlobStore, BlobStream, StorageError, UploadedFile},
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result of an owner-scoped lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum Access<T> {
    Granted(T),
    NotFound,
    /// The note exists but belongs to someone else
    Forbidden,
}

pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
    store: Arc<dyn BlobStore>,
}

async fn discard(image: Option<UploadedFile>) {
    if let Some(file) = image {
        file.discard().await;
    }
}

impl NoteService {
    pub fn new(repo: Arc<dyn NoteRepository>, store: Arc<dyn BlobStore>) -> Self {
        Self { repo, store }
    }

    /// Uploads the spooled file, then drops the local copy.
    async fn store_image(&self, image: UploadedFile) -> Result<String, StorageError> {
        let result = self.store.upload(&image).await;
        if let Ok(key) = &result {
            tracing::debug!(
                "Stored upload {:?} ({:?}) as blob {key}",
                image.file_name,
                image.content_type
            );
        }
        image.discard().await;
        result
    }

    /// Deletes a blob that no note will reference. Failure only leaves work for reconcile.
    async fn release_blob(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!("Failed to delete blob {key}, leaving it for reconciliation: {e}");
        }
    }

    pub async fn list_public(&self) -> Result<Vec<NoteWithOwner>, ServiceError> {
        Ok(self.repo.list_public().await?)
    }

    pub async fn list_own(&self, identity: &Identity) -> Result<Vec<Note>, ServiceError> {
        Ok(self.repo.list_by_owner(&identity.id).await?)
    }

    pub async fn list_public_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<NoteWithOwner>, ServiceError> {
        Ok(self.repo.list_public_by_owner(user_id).await?)
    }

    pub async fn create_note(
        &self,
        identity: &Identity,
        form: NoteForm,
        image: Option<UploadedFile>,
    ) -> Result<Note, ServiceError> {
        let draft = match form.validate() {
            Ok(draft) => draft,
            Err(e) => {
                discard(image).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.repo.upsert_user(&identity.as_owner()).await {
            discard(image).await;
            return Err(e.into());
        }

        let image_key = match image {
            Some(file) => Some(self.store_image(file).await?),
            None => None,
        };

        match self
            .repo
            .insert_note(&identity.id, draft, image_key.clone())
            .await
        {
            Ok(note) => {
                tracing::info!("User {} created note {}", identity.id, note.id);
                Ok(note)
            }
            Err(e) => {
                if let Some(key) = image_key {
                    self.release_blob(&key).await;
                }
                Err(e.into())
            }
        }
    }

    /// A note as `viewer_id` may see it. Private notes of other users are reported as missing.
    pub async fn get_visible(
        &self,
        id: i64,
        viewer_id: &str,
    ) -> Result<Option<NoteWithOwner>, ServiceError> {
        let note = self.repo.find_note_with_owner(id).await?;

        Ok(note.filter(|found| {
            found.note.status == NoteStatus::Public || found.note.is_owned_by(viewer_id)
        }))
    }

    pub async fn get_editable(
        &self,
        id: i64,
        identity: &Identity,
    ) -> Result<Access<Note>, ServiceError> {
        Ok(match self.repo.find_note(id).await? {
            None => Access::NotFound,
            Some(note) if !note.is_owned_by(&identity.id) => Access::Forbidden,
            Some(note) => Access::Granted(note),
        })
    }

    /// Applies an edit. A new image replaces the old one, whose blob is removed
    /// only after the new key has been persisted.
    pub async fn update_note(
        &self,
        id: i64,
        identity: &Identity,
        form: NoteForm,
        image: Option<UploadedFile>,
    ) -> Result<Access<Note>, ServiceError> {
        let existing = match self.get_editable(id, identity).await {
            Ok(Access::Granted(note)) => note,
            Ok(Access::NotFound) => {
                discard(image).await;
                return Ok(Access::NotFound);
            }
            Ok(Access::Forbidden) => {
                discard(image).await;
                tracing::warn!("User {} attempted to update note {id}", identity.id);
                return Ok(Access::Forbidden);
            }
            Err(e) => {
                discard(image).await;
                return Err(e);
            }
        };

        let draft = match form.validate() {
            Ok(draft) => draft,
            Err(e) => {
                discard(image).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.repo.upsert_user(&identity.as_owner()).await {
            discard(image).await;
            return Err(e.into());
        }

        let Some(image) = image else {
            let updated = self
                .repo
                .update_note(id, draft, existing.image_key)
                .await?;
            return Ok(updated.map_or(Access::NotFound, Access::Granted));
        };

        let new_key = self.store_image(image).await?;

        match self.repo.update_note(id, draft, Some(new_key.clone())).await {
            Ok(Some(updated)) => {
                if let Some(old_key) = existing.image_key {
                    self.release_blob(&old_key).await;
                }
                Ok(Access::Granted(updated))
            }
            Ok(None) => {
                self.release_blob(&new_key).await;
                Ok(Access::NotFound)
            }
            Err(e) => {
                self.release_blob(&new_key).await;
                Err(e.into())
            }
        }
    }

    /// Removes an owned note, then its image.
    pub async fn delete_note(
        &self,
        id: i64,
        identity: &Identity,
    ) -> Result<Access<()>, ServiceError> {
        let note = match self.get_editable(id, identity).await? {
            Access::Granted(note) => note,
            Access::NotFound => return Ok(Access::NotFound),
            Access::Forbidden => {
                tracing::warn!("User {} attempted to delete note {id}", identity.id);
                return Ok(Access::Forbidden);
            }
        };

        if !self.repo.delete_note(id).await? {
            return Ok(Access::NotFound);
        }

        if let Some(key) = note.image_key {
            self.release_blob(&key).await;
        }

        tracing::info!("User {} deleted note {id}", identity.id);

        Ok(Access::Granted(()))
    }

    pub async fn open_image(&self, key: &str) -> Result<Option<BlobStream>, ServiceError> {
        Ok(self.store.read_stream(key).await?)
    }
}
