//! Feedback / APK version / donation service.

use std::sync::Arc;

use carrot_backend::auth::AdminSessions;
use carrot_backend::config::{Config, Service};
use carrot_backend::db::{self, FeedbackRepository};
use carrot_backend::{create_feedback_router, init_tracing, FeedbackState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env(Service::Feedback)?;

    init_tracing(&config);

    tracing::info!("Starting {} service", config.service.name());
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Initialize database
    let pool = db::init_database(&config.db_path, config.service).await?;

    let state = FeedbackState {
        repo: Arc::new(FeedbackRepository::new(pool)),
        sessions: Arc::new(AdminSessions::new(config.admin_password.clone())),
        config: Arc::new(config.clone()),
    };

    let app = create_feedback_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
