//! Database module for SQLite persistence.
//!
//! Each service owns one SQLite file; its schema is created and migrated at startup.

mod feedback;
mod usage;

pub use feedback::*;
pub use usage::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use crate::config::Service;

/// Initialize the database connection pool and run the service's migrations.
pub async fn init_database(db_path: &Path, service: Service) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    match service {
        Service::Feedback => run_feedback_migrations(&pool).await?,
        Service::Usage => run_usage_migrations(&pool).await?,
    }

    tracing::debug!(service = service.name(), "Database migrations applied");
    Ok(pool)
}

/// Column names of `table`.
async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
}

/// Feedback service schema: feedback, APK versions, donations.
async fn run_feedback_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            time TEXT NOT NULL,
            feedback TEXT NOT NULL,
            images TEXT,
            note TEXT DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(&apk_versions_ddl("IF NOT EXISTS apk_versions"))
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS donations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount REAL NOT NULL,
            device_id TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Databases created before device ids were tracked
    if !table_columns(pool, "donations")
        .await?
        .iter()
        .any(|c| c == "device_id")
    {
        tracing::info!("Adding donations.device_id column");
        sqlx::query("ALTER TABLE donations ADD COLUMN device_id TEXT")
            .execute(pool)
            .await?;
    }

    // Databases that stored a local file_path instead of a download URL
    let apk_columns = table_columns(pool, "apk_versions").await?;
    if !apk_columns.iter().any(|c| c == "download_url") {
        if apk_columns.iter().any(|c| c == "file_path") {
            rebuild_legacy_apk_versions(pool).await?;
        } else {
            tracing::info!("Adding apk_versions.download_url column");
            sqlx::query(
                "ALTER TABLE apk_versions ADD COLUMN download_url TEXT NOT NULL DEFAULT ''",
            )
            .execute(pool)
            .await?;
        }
    }

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_feedback_created_at ON feedback(created_at);
        CREATE INDEX IF NOT EXISTS idx_apk_versions_active ON apk_versions(is_active);
        CREATE INDEX IF NOT EXISTS idx_donations_device_id ON donations(device_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// `CREATE TABLE` statement for the APK version table named by `target`.
fn apk_versions_ddl(target: &str) -> String {
    format!(
        r#"
        CREATE TABLE {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_code TEXT NOT NULL UNIQUE,
            version_name TEXT,
            update_notes TEXT NOT NULL,
            download_url TEXT NOT NULL,
            file_size INTEGER DEFAULT 0,
            upload_time TEXT NOT NULL DEFAULT (datetime('now')),
            is_active INTEGER NOT NULL DEFAULT 1
        );
        "#,
        target
    )
}

/// Replace a legacy `apk_versions` table keyed on `file_path` with the current layout.
///
/// Local paths become `/apks/{file_path}` URLs; paths that already are URLs are kept.
/// The copy, drop and rename run in one transaction.
async fn rebuild_legacy_apk_versions(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    tracing::info!("Rebuilding apk_versions without the legacy file_path column");
    let mut tx = pool.begin().await?;

    sqlx::query("DROP TABLE IF EXISTS apk_versions_new")
        .execute(&mut *tx)
        .await?;
    sqlx::query(&apk_versions_ddl("apk_versions_new"))
        .execute(&mut *tx)
        .await?;

    let copied = sqlx::query(
        r#"
        INSERT INTO apk_versions_new
            (id, version_code, version_name, update_notes, download_url, file_size, upload_time, is_active)
        SELECT id, version_code, version_name, update_notes,
            CASE
                WHEN file_path LIKE 'http%' THEN file_path
                ELSE '/apks/' || file_path
            END,
            COALESCE(file_size, 0),
            COALESCE(upload_time, datetime('now')),
            COALESCE(is_active, 0)
        FROM apk_versions
        "#,
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query("DROP TABLE apk_versions")
        .execute(&mut *tx)
        .await?;
    sqlx::query("ALTER TABLE apk_versions_new RENAME TO apk_versions")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(copied, "apk_versions rebuilt");
    Ok(())
}

/// Usage service schema: users, logs, videos.
async fn run_usage_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL UNIQUE,
            usage_count INTEGER DEFAULT 0,
            usage_duration REAL DEFAULT 0.0,
            total_distance REAL DEFAULT 0.0,
            modify_time TEXT,
            sponsor_amount REAL DEFAULT 0.0,
            user_type INTEGER DEFAULT 0,
            car_model TEXT DEFAULT '',
            wechat_name TEXT DEFAULT ''
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL,
            log_time TEXT,
            operation_record TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            video_title TEXT NOT NULL,
            video_link TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_users_modify_time ON users(modify_time);
        CREATE INDEX IF NOT EXISTS idx_logs_log_time ON logs(log_time);
        CREATE INDEX IF NOT EXISTS idx_logs_device_id ON logs(device_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
