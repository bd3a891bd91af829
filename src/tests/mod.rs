//! Integration tests for both services.

mod feedback;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use reqwest::{Client, Response};
use serde_json::Value;
use tempfile::TempDir;

use crate::auth::AdminSessions;
use crate::config::{Config, LogFormat, Service};
use crate::db::{init_database, FeedbackRepository, UsageRepository};
use crate::{create_feedback_router, create_usage_router, FeedbackState, UsageState};

const FEEDBACK_PASSWORD: &str = "1533";
const USAGE_PASSWORD: &str = "Flow2025";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    upload_dir: PathBuf,
    /// Cookie header of the current admin session, if logged in
    session: Option<String>,
    _temp_dir: TempDir,
}

fn test_config(service: Service, temp_dir: &TempDir) -> Config {
    let password = match service {
        Service::Feedback => FEEDBACK_PASSWORD,
        Service::Usage => USAGE_PASSWORD,
    };
    Config {
        service,
        admin_password: password.to_string(),
        db_path: temp_dir.path().join(format!("{}.sqlite", service.name())),
        upload_dir: temp_dir.path().join("uploads"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        log_format: LogFormat::Text,
        seed_demo_data: false,
    }
}

impl TestFixture {
    async fn feedback() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(Service::Feedback, &temp_dir);

        let pool = init_database(&config.db_path, config.service)
            .await
            .expect("Failed to init DB");

        let state = FeedbackState {
            repo: Arc::new(FeedbackRepository::new(pool)),
            sessions: Arc::new(AdminSessions::new(config.admin_password.clone())),
            config: Arc::new(config.clone()),
        };

        Self::serve(create_feedback_router(state), config, temp_dir).await
    }

    async fn usage() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(Service::Usage, &temp_dir);

        let pool = init_database(&config.db_path, config.service)
            .await
            .expect("Failed to init DB");

        let state = UsageState {
            repo: Arc::new(UsageRepository::new(pool)),
            sessions: Arc::new(AdminSessions::new(config.admin_password.clone())),
            config: Arc::new(config.clone()),
        };

        Self::serve(create_usage_router(state), config, temp_dir).await
    }

    async fn serve(app: Router, config: Config, temp_dir: TempDir) -> Self {
        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            upload_dir: config.upload_dir,
            session: None,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in and remember the session cookie.
    async fn login(&mut self, password: &str) -> Response {
        let response = self
            .client
            .post(self.url("/admin/login"))
            .form(&[("password", password)])
            .send()
            .await
            .unwrap();

        if let Some(cookie) = response.headers().get(reqwest::header::SET_COOKIE) {
            let cookie = cookie.to_str().unwrap();
            let pair = cookie.split(';').next().unwrap().to_string();
            self.session = Some(pair);
        }
        response
    }

    fn with_session(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session {
            Some(cookie) => request.header(reqwest::header::COOKIE, cookie),
            None => request,
        }
    }

    async fn get(&self, path: &str) -> Response {
        self.with_session(self.client.get(self.url(path)))
            .send()
            .await
            .unwrap()
    }

    async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.with_session(self.client.post(self.url(path)).json(body))
            .send()
            .await
            .unwrap()
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.with_session(self.client.post(self.url(path)).form(form))
            .send()
            .await
            .unwrap()
    }

    async fn post_empty(&self, path: &str) -> Response {
        self.with_session(self.client.post(self.url(path)))
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::feedback().await;
    let response = fixture.get("/health").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");

    let fixture = TestFixture::usage().await;
    let response = fixture.get("/health").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let mut fixture = TestFixture::feedback().await;

    let response = fixture.login("nope").await;
    assert_eq!(response.status(), 401);
    assert!(fixture.session.is_none());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let mut fixture = TestFixture::usage().await;

    let response = fixture.login(USAGE_PASSWORD).await;
    assert_eq!(response.status(), 200);
    assert_eq!(fixture.get("/admin").await.status(), 200);

    let response = fixture.post_empty("/admin/logout").await;
    assert_eq!(response.status(), 200);

    // The old cookie no longer unlocks the admin surface
    assert_eq!(fixture.get("/admin").await.status(), 401);
}

#[tokio::test]
async fn test_session_header_is_accepted() {
    let mut fixture = TestFixture::usage().await;
    fixture.login(USAGE_PASSWORD).await;

    let token = fixture
        .session
        .take()
        .unwrap()
        .trim_start_matches("admin_session=")
        .to_string();

    let response = fixture
        .client
        .get(fixture.url("/admin/users"))
        .header("x-admin-session", token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_sessions_are_per_caller() {
    let mut admin = TestFixture::feedback().await;
    admin.login(FEEDBACK_PASSWORD).await;
    assert_eq!(admin.get("/admin").await.status(), 200);

    // A caller without the cookie stays locked out
    let response = admin.client.get(admin.url("/admin")).send().await.unwrap();
    assert_eq!(response.status(), 401);
}
