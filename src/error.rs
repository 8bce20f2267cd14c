//! Authentication error kinds and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the session subsystem.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The OS entropy source could not produce a token.
    #[error("entropy source unavailable: {0}")]
    RandomnessFailure(String),

    /// Missing, unknown or expired credential on a protected path.
    #[error("authentication required")]
    Unauthenticated,

    /// Wrong shared secret at login.
    #[error("invalid password")]
    InvalidCredential,

    /// Login body could not be decoded.
    #[error("invalid request body: {0}")]
    MalformedRequest(String),

    /// The session map lock was poisoned by a panicking writer.
    #[error("session store unavailable")]
    StoreUnavailable,

    /// Every freshly drawn token was already present in the store.
    #[error("could not allocate a unique session token")]
    TokenCollision,
}

impl AuthError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated | AuthError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AuthError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::RandomnessFailure(_)
            | AuthError::StoreUnavailable
            | AuthError::TokenCollision => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Session subsystem failure");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
