//! Request gate for session-protected routes.
//!
//! `require_session` reads the session cookie, resolves it against the store and
//! either rejects the request with 401 or records the authenticated [`Principal`]
//! in the request extensions. Downstream handlers take `Principal` as an extractor.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::session::{Session, SessionStore};
use crate::state::AppState;

/// Authenticated identity attached to a request by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for Principal {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            expires_at: session.expires_at,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present when the route sits behind `require_session`
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Extract the session token from the request's Cookie headers.
pub fn session_token<'a>(headers: &'a HeaderMap, config: &AuthConfig) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie_header| config.parse_session_cookie(cookie_header))
}

/// Resolve the presented credential to a live session.
pub fn authenticate(
    store: &SessionStore,
    config: &AuthConfig,
    headers: &HeaderMap,
) -> Result<Session, AuthError> {
    let token = session_token(headers, config).ok_or(AuthError::Unauthenticated)?;
    store.get_by_token(token)?.ok_or(AuthError::Unauthenticated)
}

/// Middleware guarding protected routes.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let session = authenticate(&state.store, &state.config, request.headers()).inspect_err(|e| {
        debug!(path = %request.uri().path(), reason = %e, "Rejected unauthenticated request");
    })?;

    request.extensions_mut().insert(Principal::from(&session));
    Ok(next.run(request).await)
}
