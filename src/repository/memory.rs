use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use std::collections::{BTreeMap, HashMap};

use super::{NoteRepository, RepositoryError};
use crate::models::{Note, NoteDraft, NoteStatus, NoteWithOwner, Owner};

#[derive(Default)]
struct Tables {
    users: HashMap<String, String>,
    notes: BTreeMap<i64, Note>,
    next_id: i64,
}

/// Map-backed repository with the same contract as `PgRepository`.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    /// Rewrites a note's creation time so ordering can be exercised.
    pub async fn set_created_at(&self, id: i64, created_at: DateTime<Utc>) {
        if let Some(note) = self.tables.lock().await.notes.get_mut(&id) {
            note.created_at = created_at;
        }
    }
}

impl Tables {
    fn with_owner(&self, note: &Note) -> Result<NoteWithOwner, RepositoryError> {
        let display_name = self
            .users
            .get(&note.user_id)
            .ok_or_else(|| RepositoryError::Corrupt(format!("no user {}", note.user_id)))?;

        Ok(NoteWithOwner {
            note: note.clone(),
            owner: Owner {
                id: note.user_id.clone(),
                display_name: display_name.clone(),
            },
        })
    }

    fn newest_first(&self, filter: impl Fn(&Note) -> bool) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self.notes.values().filter(|n| filter(n)).collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes
    }
}

#[async_trait]
impl NoteRepository for MemoryRepository {
    async fn upsert_user(&self, owner: &Owner) -> Result<(), RepositoryError> {
        self.tables
            .lock()
            .await
            .users
            .insert(owner.id.clone(), owner.display_name.clone());
        Ok(())
    }

    async fn insert_note(
        &self,
        user_id: &str,
        draft: NoteDraft,
        image_key: Option<String>,
    ) -> Result<Note, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(user_id) {
            return Err(RepositoryError::Corrupt(format!("no user {user_id}")));
        }

        tables.next_id += 1;
        let note = Note {
            id: tables.next_id,
            title: draft.title,
            description: draft.description,
            status: draft.status,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            link: draft.link,
            subject_code: draft.subject_code,
            image_key,
        };
        tables.notes.insert(note.id, note.clone());

        Ok(note)
    }

    async fn find_note(&self, id: i64) -> Result<Option<Note>, RepositoryError> {
        Ok(self.tables.lock().await.notes.get(&id).cloned())
    }

    async fn find_note_with_owner(
        &self,
        id: i64,
    ) -> Result<Option<NoteWithOwner>, RepositoryError> {
        let tables = self.tables.lock().await;
        tables
            .notes
            .get(&id)
            .map(|note| tables.with_owner(note))
            .transpose()
    }

    async fn list_public(&self) -> Result<Vec<NoteWithOwner>, RepositoryError> {
        let tables = self.tables.lock().await;
        tables
            .newest_first(|n| n.status == NoteStatus::Public)
            .into_iter()
            .map(|note| tables.with_owner(note))
            .collect()
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Note>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .newest_first(|n| n.user_id == user_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn list_public_by_owner(
        &self,
        user_id: &str,
    ) -> Result<Vec<NoteWithOwner>, RepositoryError> {
        let tables = self.tables.lock().await;
        tables
            .newest_first(|n| n.user_id == user_id && n.status == NoteStatus::Public)
            .into_iter()
            .map(|note| tables.with_owner(note))
            .collect()
    }

    async fn update_note(
        &self,
        id: i64,
        draft: NoteDraft,
        image_key: Option<String>,
    ) -> Result<Option<Note>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.notes.get_mut(&id).map(|note| {
            note.title = draft.title;
            note.description = draft.description;
            note.status = draft.status;
            note.link = draft.link;
            note.subject_code = draft.subject_code;
            note.image_key = image_key;
            note.clone()
        }))
    }

    async fn delete_note(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.tables.lock().await.notes.remove(&id).is_some())
    }

    async fn referenced_image_keys(&self) -> Result<Vec<String>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut keys: Vec<String> = tables
            .notes
            .values()
            .filter_map(|n| n.image_key.clone())
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn clear_image_key(&self, key: &str) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let mut cleared = 0;
        for note in tables.notes.values_mut() {
            if note.image_key.as_deref() == Some(key) {
                note.image_key = None;
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}
