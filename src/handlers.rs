//! HTTP boundary for the session subsystem: login, logout, status and the
//! session-gated admin routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{middleware, Router};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::AuthError;
use crate::gate::{authenticate, require_session, session_token, Principal};
use crate::session::SessionId;
use crate::state::AppState;

/// The single principal this service authenticates.
pub const ADMIN_USER_ID: &str = "admin";

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// Build the service router. Routes added to the protected group run behind the session gate.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/admin/session", get(current_session))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/status", get(status))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// POST /api/auth/login — exchange the admin secret for a session cookie.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(request) = body.map_err(|e| AuthError::MalformedRequest(e.body_text()))?;

    if !verify_password(&request.password, &state.config.admin_password) {
        warn!("Login rejected: invalid password");
        return Err(AuthError::InvalidCredential);
    }

    let session = state.store.create(ADMIN_USER_ID)?;
    info!(
        user_id = %session.user_id,
        session = %session.id.log_prefix(),
        expires_at = %session.expires_at,
        "Login successful"
    );

    let cookie = state
        .config
        .build_session_cookie(&session.id.to_hex(), session.expires_at);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "message": "Login successful",
            "expires_at": session.expires_at,
        })),
    ))
}

/// POST /api/auth/logout — drop the presented session and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    if let Some(id) = session_token(&headers, &state.config).and_then(SessionId::from_hex) {
        if state.store.delete(&id)? {
            info!(session = %id.log_prefix(), "Logout successful");
        }
    }

    Ok((
        [(header::SET_COOKIE, state.config.build_clear_cookie())],
        Json(json!({ "message": "Logout successful" })),
    ))
}

/// GET /api/auth/status — report whether the presented cookie is a live session.
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AuthError> {
    match authenticate(&state.store, &state.config, &headers) {
        Ok(session) => Ok(Json(json!({
            "authenticated": true,
            "user_id": session.user_id,
            "expires_at": session.expires_at,
        }))),
        Err(AuthError::Unauthenticated) => Ok(Json(json!({ "authenticated": false }))),
        Err(e) => Err(e),
    }
}

/// GET /api/admin/session — the principal as seen by gated routes.
async fn current_session(principal: Principal) -> Json<Principal> {
    Json(principal)
}

/// Compare a presented password against the configured one in constant time.
///
/// Both sides are hashed first, so the fold always runs over two 32-byte
/// digests and the comparison does not leak the password length.
fn verify_password(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::session::SessionStore;
    use axum::body::Body;
    use axum::http::{Method, Request, Response, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    const PASSWORD: &str = "correct horse battery staple";

    fn test_state() -> AppState {
        let config = AuthConfig {
            admin_password: PASSWORD.to_string(),
            ..AuthConfig::default()
        };
        AppState::new(Arc::new(SessionStore::default()), config)
    }

    async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<String>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body)
            }
            None => Body::empty(),
        };
        router(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response<Body>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(response: &Response<Body>) -> Option<String> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }

    fn login_body(password: &str) -> Option<String> {
        Some(json!({ "password": password }).to_string())
    }

    #[test]
    fn test_verify_password() {
        assert!(verify_password("hunter2", "hunter2"));
        assert!(!verify_password("hunter3", "hunter2"));
        assert!(!verify_password("hunter", "hunter2"));
        assert!(!verify_password("", "hunter2"));
        assert!(!verify_password("hunter2 ", "hunter2"));
        assert!(verify_password("", ""));
    }

    #[tokio::test]
    async fn test_login_status_logout_flow() {
        let state = test_state();

        let response = send(&state, Method::POST, "/api/auth/login", None, login_body(PASSWORD)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = set_cookie(&response).expect("login must set a cookie");
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));

        let token = state.config.parse_session_cookie(&cookie).unwrap().to_string();
        let session = state.store.get_by_token(&token).unwrap().unwrap();
        assert_eq!(session.user_id, ADMIN_USER_ID);
        assert_eq!(session.expires_at - session.created_at, chrono::Duration::hours(24));

        let expires = session.expires_at.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        assert!(cookie.contains(&format!("Expires={}", expires)));

        let body = json_body(response).await;
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["expires_at"], serde_json::to_value(session.expires_at).unwrap());

        let cookie_header = format!("session_id={}", token);
        let response = send(&state, Method::GET, "/api/auth/status", Some(&cookie_header), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user_id"], ADMIN_USER_ID);
        assert_eq!(body["expires_at"], serde_json::to_value(session.expires_at).unwrap());

        let response = send(&state, Method::POST, "/api/auth/logout", Some(&cookie_header), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cleared = set_cookie(&response).unwrap();
        assert!(cleared.starts_with("session_id=;"));
        assert!(cleared.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert_eq!(state.store.session_count().unwrap(), 0);

        let response = send(&state, Method::GET, "/api/auth/status", Some(&cookie_header), None).await;
        let body = json_body(response).await;
        assert_eq!(body, json!({ "authenticated": false }));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let state = test_state();

        let response = send(&state, Method::POST, "/api/auth/login", None, login_body("nope")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&response).is_none());
        assert_eq!(state.store.session_count().unwrap(), 0);

        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid password");
    }

    #[tokio::test]
    async fn test_login_malformed_body() {
        let state = test_state();

        let response = send(
            &state,
            Method::POST,
            "/api/auth/login",
            None,
            Some("{\"pass".to_string()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(set_cookie(&response).is_none());
        assert_eq!(state.store.session_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_logout_without_session() {
        let state = test_state();

        let response = send(&state, Method::POST, "/api/auth/logout", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));

        // Unknown token twice: still fine
        let cookie = format!("session_id={}", "cd".repeat(32));
        for _ in 0..2 {
            let response = send(&state, Method::POST, "/api/auth/logout", Some(&cookie), None).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_status_expired_session() {
        let state = test_state();
        let stale = state
            .store
            .create_at(ADMIN_USER_ID, Utc::now() - chrono::Duration::hours(25))
            .unwrap();

        let cookie = format!("session_id={}", stale.id);
        let response = send(&state, Method::GET, "/api/auth/status", Some(&cookie), None).await;
        assert_eq!(json_body(response).await, json!({ "authenticated": false }));

        // Lazily evicted by the lookup
        assert_eq!(state.store.session_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_protected_route() {
        let state = test_state();

        let response = send(&state, Method::GET, "/api/admin/session", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let session = state.store.create(ADMIN_USER_ID).unwrap();
        let cookie = format!("theme=dark; session_id={}", session.id);
        let response = send(&state, Method::GET, "/api/admin/session", Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["user_id"], ADMIN_USER_ID);
        assert_eq!(body["expires_at"], serde_json::to_value(session.expires_at).unwrap());
    }
}
