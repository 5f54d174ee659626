use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{dto::FormError, service::ServiceError, views};

/// Failures surfaced by request handlers. Users only ever see a generic page.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Unreadable form: {0}")]
    Form(#[from] FormError),

    #[error("{0}")]
    Service(#[from] ServiceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => {
                tracing::info!("Request for a missing or hidden resource");
                return (StatusCode::NOT_FOUND, views::not_found()).into_response();
            }
            Self::Form(_) | Self::Service(ServiceError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!("Request failed: {self}");
        (status, views::server_error()).into_response()
    }
}
