use axum::extract::{
    Multipart,
    multipart::{Field, MultipartError},
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use utoipa::ToSchema;

use std::path::Path;

use crate::{
    models::{NoteDraft, NoteStatus, UnknownStatus},
    storage::{UploadedFile, new_key},
};

/// Multipart field carrying the preview image
pub const IMAGE_FIELD: &str = "preimage";

/// Text fields accepted from the note form. Anything else submitted is dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NoteForm {
    /// Note title, required
    pub title: Option<String>,
    pub description: Option<String>,
    /// `public` (default) or `private`
    pub status: Option<String>,
    /// External link, required
    pub link: Option<String>,
    /// Subject tag, required
    #[serde(rename = "subjectCode")]
    pub subject_code: Option<String>,
}

/// Multipart body of the create and update routes, as documented in OpenAPI.
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct NoteUpload {
    #[serde(flatten)]
    pub form: NoteForm,
    /// Preview image, optional
    #[schema(value_type = Option<String>, format = Binary)]
    pub preimage: Option<Vec<u8>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Link is required")]
    MissingLink,

    #[error("Subject code is required")]
    MissingSubjectCode,

    #[error("Invalid status: {0}")]
    Status(#[from] UnknownStatus),
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Malformed multipart payload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Failed to spool uploaded file: {0}")]
    Spool(#[from] std::io::Error),
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl NoteForm {
    pub fn validate(self) -> Result<NoteDraft, ValidationError> {
        let title = trimmed(self.title).ok_or(ValidationError::MissingTitle)?;
        let link = trimmed(self.link).ok_or(ValidationError::MissingLink)?;
        let subject_code = trimmed(self.subject_code).ok_or(ValidationError::MissingSubjectCode)?;
        let status = match trimmed(self.status) {
            Some(status) => status.parse::<NoteStatus>()?,
            None => NoteStatus::default(),
        };

        Ok(NoteDraft {
            title,
            description: trimmed(self.description),
            status,
            link,
            subject_code,
        })
    }

    fn set(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = Some(value),
            "description" => self.description = Some(value),
            "status" => self.status = Some(value),
            "link" => self.link = Some(value),
            "subjectCode" => self.subject_code = Some(value),
            _ => {}
        }
    }
}

/// Reads the note form, spooling the image (if any) under `upload_dir`.
///
/// An empty file part, as browsers send when no file was picked, yields no
/// image. On error nothing is left behind in `upload_dir`.
pub async fn read_note_form(
    mut multipart: Multipart,
    upload_dir: &Path,
) -> Result<(NoteForm, Option<UploadedFile>), FormError> {
    let mut form = NoteForm::default();
    let mut image = None;

    if let Err(e) = read_fields(&mut multipart, upload_dir, &mut form, &mut image).await {
        if let Some(file) = image {
            file.discard().await;
        }
        return Err(e);
    }

    Ok((form, image))
}

async fn read_fields(
    multipart: &mut Multipart,
    upload_dir: &Path,
    form: &mut NoteForm,
    image: &mut Option<UploadedFile>,
) -> Result<(), FormError> {
    while let Some(mut field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name != IMAGE_FIELD {
            let value = field.text().await?;
            form.set(&name, value);
            continue;
        }

        if let Some(previous) = image.take() {
            previous.discard().await;
        }

        tokio::fs::create_dir_all(upload_dir).await?;
        let path = upload_dir.join(new_key());
        *image = Some(UploadedFile {
            path: path.clone(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
        });

        if spool_field(&mut field, &path).await? == 0
            && let Some(empty) = image.take()
        {
            empty.discard().await;
        }
    }

    Ok(())
}

async fn spool_field(field: &mut Field<'_>, path: &Path) -> Result<u64, FormError> {
    let mut out = tokio::fs::File::create(path).await?;
    let mut written = 0;

    while let Some(chunk) = field.chunk().await? {
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;

    Ok(written)
}
