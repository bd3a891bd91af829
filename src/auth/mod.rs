//! Admin session gate.
//!
//! A successful login issues an opaque session token that carries the admin
//! flag; the gate middleware rejects every request whose token is unknown.
//! Password checks use constant-time comparison to mitigate timing attacks.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::api::{ApiResponse, JsonOrForm};
use crate::errors::AppError;

/// Cookie carrying the admin session token.
pub const SESSION_COOKIE: &str = "admin_session";

/// Header alternative to the cookie, for non-browser clients.
pub const SESSION_HEADER: &str = "x-admin-session";

/// In-memory set of admin sessions for one service.
pub struct AdminSessions {
    password: String,
    tokens: RwLock<HashSet<String>>,
}

impl AdminSessions {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            tokens: RwLock::new(HashSet::new()),
        }
    }

    /// Check `password` and open a new session on match.
    pub async fn login(&self, password: &str) -> Option<String> {
        if !constant_time_compare(password, &self.password) {
            return None;
        }
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.tokens.write().await.insert(token.clone());
        Some(token)
    }

    /// Close a session. Returns whether it was open.
    pub async fn logout(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token)
    }

    pub async fn is_admin(&self, token: &str) -> bool {
        self.tokens.read().await.contains(token)
    }
}

/// Gate middleware: only requests carrying an open admin session reach `next`.
pub async fn admin_session_layer(
    State(sessions): State<Arc<AdminSessions>>,
    request: Request,
    next: Next,
) -> Response {
    match session_token(request.headers()) {
        Some(token) if sessions.is_admin(&token).await => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected unknown admin session");
            AppError::Unauthorized("Admin session expired or invalid".to_string()).into_response()
        }
        None => {
            tracing::debug!(path = %request.uri().path(), "Rejected request without admin session");
            AppError::Unauthorized("Admin login required".to_string()).into_response()
        }
    }
}

/// Extract the session token from the cookie or the session header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string());

    from_cookie.or_else(|| {
        headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Login form body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /admin/login - Open an admin session.
pub async fn login(
    State(sessions): State<Arc<AdminSessions>>,
    JsonOrForm(request): JsonOrForm<LoginRequest>,
) -> Result<Response, AppError> {
    let password = request.password.unwrap_or_default();

    let Some(token) = sessions.login(&password).await else {
        tracing::warn!("Admin login failed: wrong password");
        return Err(AppError::Unauthorized("Wrong password".to_string()));
    };

    tracing::info!("Admin logged in");
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token
    );
    let mut response = ApiResponse::message("Login successful").into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

/// GET|POST /admin/logout - Close the caller's admin session.
pub async fn logout(State(sessions): State<Arc<AdminSessions>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if sessions.logout(&token).await {
            tracing::info!("Admin logged out");
        }
    }

    let mut response = ApiResponse::message("Logged out").into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static("admin_session=; Path=/; HttpOnly; Max-Age=0"),
    );
    response
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("Flow2025", "Flow2025"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("1533", "1534"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("153", "1533"));
        assert!(!constant_time_compare("", "1533"));
    }

    #[tokio::test]
    async fn test_login_logout_cycle() {
        let sessions = AdminSessions::new("1533");

        assert!(sessions.login("wrong").await.is_none());

        let token = sessions.login("1533").await.unwrap();
        assert!(sessions.is_admin(&token).await);

        assert!(sessions.logout(&token).await);
        assert!(!sessions.is_admin(&token).await);
        assert!(!sessions.logout(&token).await);
    }

    #[test]
    fn test_session_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_session=abc123"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_session_token_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_session_token_missing() {
        let mut headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("admin_session="));
        assert!(session_token(&headers).is_none());
    }

    #[test]
    fn test_empty_cookie_falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("admin_session=; lang=zh"));
        headers.insert(SESSION_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));

        headers.insert(SESSION_HEADER, HeaderValue::from_static("   "));
        assert!(session_token(&headers).is_none());
    }
}
