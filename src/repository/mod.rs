mod embedded;
#[cfg(test)]
mod memory;
mod postgres;

#[cfg(test)]
pub use memory::MemoryRepository;
pub use postgres::PgRepository;

use async_trait::async_trait;

use crate::models::{Note, NoteDraft, NoteWithOwner, Owner};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Corrupt note row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Records the owner's display data so notes can be joined with it.
    async fn upsert_user(&self, owner: &Owner) -> Result<(), RepositoryError>;

    async fn insert_note(
        &self,
        user_id: &str,
        draft: NoteDraft,
        image_key: Option<String>,
    ) -> Result<Note, RepositoryError>;

    async fn find_note(&self, id: i64) -> Result<Option<Note>, RepositoryError>;

    async fn find_note_with_owner(&self, id: i64)
    -> Result<Option<NoteWithOwner>, RepositoryError>;

    /// Public notes, most recent first.
    async fn list_public(&self) -> Result<Vec<NoteWithOwner>, RepositoryError>;

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Note>, RepositoryError>;

    async fn list_public_by_owner(
        &self,
        user_id: &str,
    ) -> Result<Vec<NoteWithOwner>, RepositoryError>;

    /// Applies the draft and image key. Owner and creation time are left as they are.
    async fn update_note(
        &self,
        id: i64,
        draft: NoteDraft,
        image_key: Option<String>,
    ) -> Result<Option<Note>, RepositoryError>;

    async fn delete_note(&self, id: i64) -> Result<bool, RepositoryError>;

    async fn referenced_image_keys(&self) -> Result<Vec<String>, RepositoryError>;

    /// Drops `key` from every note referencing it, returning how many changed.
    async fn clear_image_key(&self, key: &str) -> Result<u64, RepositoryError>;
}
