//! Device usage tracking and admin dashboard service.

use std::sync::Arc;

use carrot_backend::auth::AdminSessions;
use carrot_backend::config::{Config, Service};
use carrot_backend::db::{self, UsageRepository};
use carrot_backend::{create_usage_router, init_tracing, UsageState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env(Service::Usage)?;

    init_tracing(&config);

    tracing::info!("Starting {} service", config.service.name());
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path, config.service).await?;
    let repo = Arc::new(UsageRepository::new(pool));

    if config.seed_demo_data && repo.seed_demo_data().await? {
        tracing::info!("Seeded demo data into empty database");
    }

    let state = UsageState {
        repo,
        sessions: Arc::new(AdminSessions::new(config.admin_password.clone())),
        config: Arc::new(config.clone()),
    };

    let app = create_usage_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
