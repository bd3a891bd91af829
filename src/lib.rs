//! CarrotAmap backends
//!
//! Two REST services over SQLite: feedback / APK-version / donation
//! distribution, and device usage tracking with an admin dashboard.
//! Both gate their admin surface behind a per-session admin flag.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod uploads;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::AdminSessions;
use config::{Config, LogFormat};
use db::{FeedbackRepository, UsageRepository};

/// Maximum accepted request body (feedback images included).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared state of the feedback service.
#[derive(Clone)]
pub struct FeedbackState {
    pub repo: Arc<FeedbackRepository>,
    pub sessions: Arc<AdminSessions>,
    pub config: Arc<Config>,
}

impl FromRef<FeedbackState> for Arc<AdminSessions> {
    fn from_ref(state: &FeedbackState) -> Self {
        state.sessions.clone()
    }
}

/// Shared state of the usage service.
#[derive(Clone)]
pub struct UsageState {
    pub repo: Arc<UsageRepository>,
    pub sessions: Arc<AdminSessions>,
    pub config: Arc<Config>,
}

impl FromRef<UsageState> for Arc<AdminSessions> {
    fn from_ref(state: &UsageState) -> Self {
        state.sessions.clone()
    }
}

/// Initialize the global tracing subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Create the feedback service router.
pub fn create_feedback_router(state: FeedbackState) -> Router {
    let admin_routes = Router::new()
        .route("/admin", get(api::admin_feedback))
        .route("/admin/delete/{id}", post(api::delete_feedback))
        .route("/admin/update_note/{id}", post(api::update_note))
        // APK versions
        .route("/admin/apk/add", post(api::add_apk_version))
        .route("/admin/apk/list", get(api::list_apk_versions))
        .route("/admin/apk/delete/{id}", post(api::delete_apk_version))
        // Donations
        .route("/admin/donations/list", get(api::admin_list_donations))
        .route("/admin/donations/delete/{id}", post(api::delete_donation))
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            auth::admin_session_layer,
        ));

    let public_routes = Router::new()
        .route("/api/feedback", get(api::list_feedback).post(api::submit_feedback))
        .route("/api/apk/version", get(api::latest_apk_version))
        .route("/api/donation", post(api::submit_donation))
        .route("/api/donations", get(api::list_donations))
        .route("/admin/login", post(auth::login))
        .route("/admin/logout", get(auth::logout).post(auth::logout))
        .route("/health", get(health_check));

    let uploads = ServeDir::new(&state.config.upload_dir);

    let router = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .nest_service("/uploads", uploads);

    with_common_layers(router).with_state(state)
}

/// Create the usage service router.
pub fn create_usage_router(state: UsageState) -> Router {
    let admin_routes = Router::new()
        .route("/admin", get(api::dashboard))
        // Users
        .route("/admin/users", get(api::admin_list_users))
        .route("/admin/users/add", post(api::admin_add_user))
        .route("/admin/users/edit/{id}", post(api::admin_edit_user))
        .route("/admin/users/delete/{id}", post(api::admin_delete_user))
        // Logs
        .route("/admin/logs", get(api::list_logs))
        .route("/admin/logs/add", post(api::add_log))
        .route("/admin/logs/edit/{id}", post(api::edit_log))
        .route("/admin/logs/delete/{id}", post(api::delete_log))
        // Videos
        .route("/admin/videos", get(api::list_videos))
        .route("/admin/videos/add", post(api::add_video))
        .route("/admin/videos/edit/{id}", post(api::edit_video))
        .route("/admin/videos/delete/{id}", post(api::delete_video))
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            auth::admin_session_layer,
        ));

    let public_routes = Router::new()
        .route("/api/user/register", post(api::register_user))
        .route("/api/user/update", post(api::update_user))
        .route("/api/user/{device_id}", get(api::get_user))
        .route("/api/videos", get(api::list_videos))
        .route("/api/videos/{id}", get(api::get_video))
        .route("/api/leaderboard", get(api::leaderboard))
        .route("/admin/login", post(auth::login))
        .route("/admin/logout", get(auth::logout).post(auth::logout))
        .route("/health", get(health_check));

    let router = Router::new().merge(public_routes).merge(admin_routes);

    with_common_layers(router).with_state(state)
}

/// Body limit, CORS and request tracing shared by both services.
fn with_common_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
    )
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
