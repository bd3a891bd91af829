//! Configuration module for the Carrot backends.
//!
//! Both services read their configuration from environment variables with a
//! per-service prefix (`FEEDBACK_` or `USAGE_`) and fall back to sensible defaults.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Which of the two backends a configuration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Feedback, APK versions and donations.
    Feedback,
    /// Device usage tracking and the admin dashboard.
    Usage,
}

impl Service {
    /// Environment variable prefix for this service.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Service::Feedback => "FEEDBACK",
            Service::Usage => "USAGE",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Service::Feedback => "feedback",
            Service::Usage => "usage",
        }
    }

    fn default_admin_password(&self) -> &'static str {
        match self {
            Service::Feedback => "1533",
            Service::Usage => "Flow2025",
        }
    }

    fn default_db_path(&self) -> &'static str {
        match self {
            Service::Feedback => "./data/feedback.db",
            Service::Usage => "./data/database.db",
        }
    }

    fn default_bind_addr(&self) -> &'static str {
        match self {
            Service::Feedback => "127.0.0.1:5000",
            Service::Usage => "127.0.0.1:5001",
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub service: Service,
    /// Plaintext admin password checked on login
    pub admin_password: String,
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Directory holding uploaded feedback images
    pub upload_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Seed demo rows into an empty usage database
    pub seed_demo_data: bool,
}

impl Config {
    /// Load configuration for `service` from environment variables.
    ///
    /// | Variable | Default (feedback / usage) |
    /// |----------|----------------------------|
    /// | `*_ADMIN_PASSWORD` | `1533` / `Flow2025` |
    /// | `*_DB_PATH` | `./data/feedback.db` / `./data/database.db` |
    /// | `*_UPLOAD_DIR` | `./uploads` |
    /// | `*_BIND_ADDR` | `127.0.0.1:5000` / `127.0.0.1:5001` |
    /// | `*_LOG_LEVEL` | `info` |
    /// | `*_LOG_FORMAT` | `text` |
    /// | `*_SEED_DEMO_DATA` | `false` |
    pub fn from_env(service: Service) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let var = |name: &str| env::var(format!("{}_{}", service.env_prefix(), name)).ok();

        let admin_password = var("ADMIN_PASSWORD")
            .unwrap_or_else(|| service.default_admin_password().to_string());

        let db_path = var("DB_PATH")
            .unwrap_or_else(|| service.default_db_path().to_string())
            .into();

        let upload_dir = var("UPLOAD_DIR")
            .unwrap_or_else(|| "./uploads".to_string())
            .into();

        let raw_addr = var("BIND_ADDR").unwrap_or_else(|| service.default_bind_addr().to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(raw_addr))?;

        let log_level = var("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match var("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            None => LogFormat::Text,
        };

        let seed_demo_data = var("SEED_DEMO_DATA")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            service,
            admin_password,
            db_path,
            upload_dir,
            bind_addr,
            log_level,
            log_format,
            seed_demo_data,
        })
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    InvalidBindAddr(String),
    InvalidLogFormat(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBindAddr(raw) => write!(f, "Invalid bind address: {}", raw),
            ConfigError::InvalidLogFormat(raw) => {
                write!(f, "Invalid log format '{}', expected 'text' or 'json'", raw)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
