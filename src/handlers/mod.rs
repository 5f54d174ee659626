pub mod index;
mod method_override;
pub mod notes;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    routing::get,
};
use tower::{Layer, util::MapRequestLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use crate::{
    dto::{NoteForm, NoteUpload},
    state::AppState,
};

use method_override::method_override;

#[derive(OpenApi)]
#[openapi(
    paths(
        index::landing,
        index::dashboard,
        notes::add_page,
        notes::create_note,
        notes::list_public,
        notes::show_note,
        notes::edit_page,
        notes::update_note,
        notes::delete_note,
        notes::list_user_notes,
        notes::get_image
    ),
    components(schemas(NoteForm, NoteUpload)),
    tags(
        (name = "pages", description = "Landing page and dashboard"),
        (name = "notes", description = "Notes management")
    )
)]
pub struct ApiDoc;

/// The full service: routes behind the method-override rewrite.
pub type App = tower::util::MapRequest<Router, fn(Request) -> Request>;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index::landing))
        .route("/dashboard", get(index::dashboard))
        .route("/notes", get(notes::list_public).post(notes::create_note))
        .route("/notes/add", get(notes::add_page))
        .route(
            "/notes/{id}",
            get(notes::show_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/notes/edit/{id}", get(notes::edit_page))
        .route("/notes/user/{user_id}", get(notes::list_user_notes))
        .route("/notes/images/{key}", get(notes::get_image))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub fn app(state: Arc<AppState>) -> App {
    MapRequestLayer::new(method_override as fn(Request) -> Request).layer(router(state))
}
