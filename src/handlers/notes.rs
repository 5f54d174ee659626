use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_macros::debug_handler;

use std::sync::Arc;

use crate::{
    auth::CurrentUser,
    dto::{NoteUpload, read_note_form},
    error::AppError,
    service::Access,
    state::AppState,
    views,
};

/// Ids that are not numbers name no note.
fn parse_note_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>().map_err(|_| AppError::NotFound)
}

#[utoipa::path(
    get,
    path = "/notes/add",
    responses(
        (status = 200, description = "New note form", content_type = "text/html", body = String)
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn add_page(_user: CurrentUser) -> Response {
    views::add_form().into_response()
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body(content = NoteUpload, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Note created, redirect to the dashboard"),
        (status = 400, description = "Invalid form"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let (form, image) = read_note_form(multipart, &state.config.upload_dir).await?;
    state.service.create_note(&identity, form, image).await?;

    Ok(Redirect::to("/dashboard").into_response())
}

#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (status = 200, description = "All public notes, newest first", content_type = "text/html", body = String),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn list_public(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Response, AppError> {
    let notes = state.service.list_public().await?;

    Ok(views::notes_index(&notes, &identity.id, &state.config.date_format).into_response())
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note found", content_type = "text/html", body = String),
        (status = 404, description = "No such note, or a private note of another user"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn show_note(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_note_id(&id)?;
    let note = state
        .service
        .get_visible(id, &identity.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(views::show(&note, &identity.id, &state.config.date_format).into_response())
}

#[utoipa::path(
    get,
    path = "/notes/edit/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Edit form", content_type = "text/html", body = String),
        (status = 303, description = "Not the owner, redirect to the notes list"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn edit_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_note_id(&id)?;

    match state.service.get_editable(id, &identity).await? {
        Access::Granted(note) => Ok(views::edit_form(&note).into_response()),
        Access::NotFound => Err(AppError::NotFound),
        Access::Forbidden => Ok(Redirect::to("/notes").into_response()),
    }
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    request_body(content = NoteUpload, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Note updated, redirect to the dashboard; or not the owner, redirect to the notes list"),
        (status = 400, description = "Invalid form"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let id = parse_note_id(&id)?;
    let (form, image) = read_note_form(multipart, &state.config.upload_dir).await?;

    match state.service.update_note(id, &identity, form, image).await? {
        Access::Granted(_) => Ok(Redirect::to("/dashboard").into_response()),
        Access::NotFound => Err(AppError::NotFound),
        Access::Forbidden => Ok(Redirect::to("/notes").into_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 303, description = "Note deleted, redirect to the dashboard; or not the owner, redirect to the notes list"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_note_id(&id)?;

    match state.service.delete_note(id, &identity).await? {
        Access::Granted(()) => Ok(Redirect::to("/dashboard").into_response()),
        Access::NotFound => Err(AppError::NotFound),
        Access::Forbidden => Ok(Redirect::to("/notes").into_response()),
    }
}

#[utoipa::path(
    get,
    path = "/notes/user/{user_id}",
    params(
        ("user_id" = String, Path, description = "Owner ID")
    ),
    responses(
        (status = 200, description = "The user's public notes", content_type = "text/html", body = String),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn list_user_notes(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let notes = state.service.list_public_by_user(&user_id).await?;

    Ok(views::notes_index(&notes, &identity.id, &state.config.date_format).into_response())
}

#[utoipa::path(
    get,
    path = "/notes/images/{key}",
    params(
        ("key" = String, Path, description = "Image key")
    ),
    responses(
        (status = 200, description = "Raw image bytes", content_type = "application/octet-stream"),
        (status = 404, description = "No such image"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let stream = state
        .service
        .open_image(&key)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}
