//! Request guards.
//!
//! Login happens upstream: an authenticating proxy forwards the signed-in
//! user's id and name in headers named by [`AuthConfig`]. A request without
//! the identity header is a guest.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
    response::Redirect,
};

use std::sync::Arc;

use crate::{config::AuthConfig, models::Owner, state::AppState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
}

impl Identity {
    pub fn as_owner(&self) -> Owner {
        Owner {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Authenticated(Identity),
    Guest,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn classify(headers: &HeaderMap, config: &AuthConfig) -> AuthState {
    let Some(id) = header_value(headers, &config.identity_header) else {
        return AuthState::Guest;
    };
    let display_name = header_value(headers, &config.name_header).unwrap_or_else(|| id.clone());

    AuthState::Authenticated(Identity { id, display_name })
}

/// Signed-in user. Guests are redirected to the landing page.
pub struct CurrentUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match classify(&parts.headers, &state.config.auth) {
            AuthState::Authenticated(identity) => Ok(Self(identity)),
            AuthState::Guest => Err(Redirect::to("/")),
        }
    }
}

/// Guest-only pages. Signed-in users are sent to their dashboard.
pub struct GuestOnly;

impl FromRequestParts<Arc<AppState>> for GuestOnly {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match classify(&parts.headers, &state.config.auth) {
            AuthState::Authenticated(_) => Err(Redirect::to("/dashboard")),
            AuthState::Guest => Ok(Self),
        }
    }
}
