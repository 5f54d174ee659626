use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};

use super::{NoteRepository, RepositoryError, embedded::migrations};
use crate::models::{Note, NoteDraft, NoteStatus, NoteWithOwner, Owner};

const NOTE_COLUMNS: &str =
    "n.id, n.title, n.description, n.status, n.user_id, n.created_at, n.link, n.subject_code, n.image_key";

const RETURNING_COLUMNS: &str =
    "id, title, description, status, user_id, created_at, link, subject_code, image_key";

pub struct PgRepository {
    client: Client,
}

impl PgRepository {
    pub async fn new(database_dsn: &str) -> Result<Self, tokio_postgres::Error> {
        let (client, con) = tokio_postgres::connect(database_dsn, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = con.await {
                tracing::error!("connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    pub async fn migrate(&mut self) -> Result<(), refinery::Error> {
        let migrations_report = migrations::runner().run_async(&mut self.client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }

    async fn query_with_owner(
        &self,
        filter: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<NoteWithOwner>, RepositoryError> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS}, u.display_name FROM notes n \
             JOIN users u ON u.id = n.user_id {filter}"
        );
        let rows = self.client.query(&sql, params).await?;

        rows.iter().map(note_with_owner_from_row).collect()
    }
}

fn note_from_row(row: &Row) -> Result<Note, RepositoryError> {
    let status: String = row.get("status");
    let status = status
        .parse::<NoteStatus>()
        .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

    Ok(Note {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        status,
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        link: row.get("link"),
        subject_code: row.get("subject_code"),
        image_key: row.get("image_key"),
    })
}

fn note_with_owner_from_row(row: &Row) -> Result<NoteWithOwner, RepositoryError> {
    let note = note_from_row(row)?;
    let owner = Owner {
        id: note.user_id.clone(),
        display_name: row.get("display_name"),
    };

    Ok(NoteWithOwner { note, owner })
}

#[async_trait]
impl NoteRepository for PgRepository {
    async fn upsert_user(&self, owner: &Owner) -> Result<(), RepositoryError> {
        self.client
            .execute(
                "INSERT INTO users (id, display_name) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name",
                &[&owner.id, &owner.display_name],
            )
            .await?;

        Ok(())
    }

    async fn insert_note(
        &self,
        user_id: &str,
        draft: NoteDraft,
        image_key: Option<String>,
    ) -> Result<Note, RepositoryError> {
        let sql = format!(
            "INSERT INTO notes (title, description, status, user_id, link, subject_code, image_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {RETURNING_COLUMNS}"
        );
        let row = self
            .client
            .query_one(
                &sql,
                &[
                    &draft.title,
                    &draft.description,
                    &draft.status.as_str(),
                    &user_id,
                    &draft.link,
                    &draft.subject_code,
                    &image_key,
                ],
            )
            .await?;

        note_from_row(&row)
    }

    async fn find_note(&self, id: i64) -> Result<Option<Note>, RepositoryError> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes n WHERE n.id = $1");
        let row = self.client.query_opt(&sql, &[&id]).await?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn find_note_with_owner(
        &self,
        id: i64,
    ) -> Result<Option<NoteWithOwner>, RepositoryError> {
        Ok(self
            .query_with_owner("WHERE n.id = $1", &[&id])
            .await?
            .into_iter()
            .next())
    }

    async fn list_public(&self) -> Result<Vec<NoteWithOwner>, RepositoryError> {
        self.query_with_owner(
            "WHERE n.status = 'public' ORDER BY n.created_at DESC",
            &[],
        )
        .await
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Note>, RepositoryError> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes n WHERE n.user_id = $1 ORDER BY n.created_at DESC"
        );
        let rows = self.client.query(&sql, &[&user_id]).await?;

        rows.iter().map(note_from_row).collect()
    }

    async fn list_public_by_owner(
        &self,
        user_id: &str,
    ) -> Result<Vec<NoteWithOwner>, RepositoryError> {
        self.query_with_owner(
            "WHERE n.user_id = $1 AND n.status = 'public' ORDER BY n.created_at DESC",
            &[&user_id],
        )
        .await
    }

    async fn update_note(
        &self,
        id: i64,
        draft: NoteDraft,
        image_key: Option<String>,
    ) -> Result<Option<Note>, RepositoryError> {
        let sql = format!(
            "UPDATE notes SET title = $1, description = $2, status = $3, link = $4, \
             subject_code = $5, image_key = $6 WHERE id = $7 RETURNING {RETURNING_COLUMNS}"
        );
        let row = self
            .client
            .query_opt(
                &sql,
                &[
                    &draft.title,
                    &draft.description,
                    &draft.status.as_str(),
                    &draft.link,
                    &draft.subject_code,
                    &image_key,
                    &id,
                ],
            )
            .await?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn delete_note(&self, id: i64) -> Result<bool, RepositoryError> {
        let rows = self
            .client
            .execute("DELETE FROM notes WHERE id = $1", &[&id])
            .await?;

        Ok(rows == 1)
    }

    async fn referenced_image_keys(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = self
            .client
            .query(
                "SELECT DISTINCT image_key FROM notes WHERE image_key IS NOT NULL",
                &[],
            )
            .await?;

        Ok(rows.iter().map(|row| row.get("image_key")).collect())
    }

    async fn clear_image_key(&self, key: &str) -> Result<u64, RepositoryError> {
        Ok(self
            .client
            .execute(
                "UPDATE notes SET image_key = NULL WHERE image_key = $1",
                &[&key],
            )
            .await?)
    }
}
