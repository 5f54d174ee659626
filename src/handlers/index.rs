use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;

use std::sync::Arc;

use crate::{
    auth::{CurrentUser, GuestOnly},
    error::AppError,
    state::AppState,
    views,
};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Login page", content_type = "text/html", body = String),
        (status = 303, description = "Already signed in, redirect to the dashboard")
    ),
    tag = "pages"
)]
#[debug_handler]
pub async fn landing(State(state): State<Arc<AppState>>, _guest: GuestOnly) -> Response {
    views::login(&state.config.auth.login_url).into_response()
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "The signed-in user's notes", content_type = "text/html", body = String),
        (status = 303, description = "Guest, redirect to the login page"),
        (status = 500, description = "Internal server error")
    ),
    tag = "pages"
)]
#[debug_handler]
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Response, AppError> {
    let notes = state.service.list_own(&identity).await?;

    Ok(views::dashboard(&identity.display_name, &notes, &state.config.date_format).into_response())
}
