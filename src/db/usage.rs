//! Repository for the usage service: user profiles, operation logs, videos.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    DashboardStats, Leaderboard, NewOperationLog, NewVideo, OperationLog, ProfileChanges,
    ProfileRecord, RegistrationOutcome, Telemetry, UserProfile, UserTier, Video,
};

const PROFILE_COLUMNS: &str = "id, device_id, usage_count, usage_duration, total_distance, modify_time, sponsor_amount, user_type, car_model, wechat_name";

/// Database repository for the usage service.
#[derive(Clone)]
pub struct UsageRepository {
    pool: SqlitePool,
}

impl UsageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== PROFILE OPERATIONS ====================

    /// List all profiles, most recently modified first.
    pub async fn list_profiles(&self) -> Result<Vec<UserProfile>, AppError> {
        self.profiles_ordered_by("modify_time DESC", None).await
    }

    async fn profiles_ordered_by(
        &self,
        order: &str,
        limit: Option<i64>,
    ) -> Result<Vec<UserProfile>, AppError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY {}, id DESC LIMIT ?",
            PROFILE_COLUMNS, order
        );
        let rows = sqlx::query(&sql)
            .bind(limit.unwrap_or(-1))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(profile_from_row).collect())
    }

    /// Get a profile by row ID.
    pub async fn get_profile(&self, id: i64) -> Result<Option<UserProfile>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", PROFILE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    /// Get a profile by device ID.
    pub async fn get_profile_by_device(
        &self,
        device_id: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE device_id = ?", PROFILE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    /// Upsert a telemetry report keyed by device ID.
    ///
    /// New devices are created with tier `New`. Existing devices get their
    /// counters overwritten; the wechat name only changes when one is supplied.
    /// Concurrent reports for one device resolve last-writer-wins.
    pub async fn register_telemetry(
        &self,
        report: &Telemetry,
    ) -> Result<RegistrationOutcome, AppError> {
        let now = Utc::now().to_rfc3339();

        if let Some(existing) = self.get_profile_by_device(&report.device_id).await? {
            sqlx::query(
                "UPDATE users SET usage_count = ?, usage_duration = ?, total_distance = ?, wechat_name = COALESCE(?, wechat_name), modify_time = ? WHERE id = ?",
            )
            .bind(report.usage_count)
            .bind(report.usage_duration)
            .bind(report.total_distance)
            .bind(&report.wechat_name)
            .bind(&now)
            .bind(existing.id)
            .execute(&self.pool)
            .await?;

            return Ok(RegistrationOutcome {
                user_type: existing.user_type,
                time: RegistrationOutcome::RETURNING_TIME,
            });
        }

        sqlx::query(
            "INSERT INTO users (device_id, usage_count, usage_duration, total_distance, modify_time, sponsor_amount, user_type, car_model, wechat_name) VALUES (?, ?, ?, ?, ?, 0.0, ?, '', ?)",
        )
        .bind(&report.device_id)
        .bind(report.usage_count)
        .bind(report.usage_duration)
        .bind(report.total_distance)
        .bind(&now)
        .bind(i64::from(UserTier::New))
        .bind(report.wechat_name.as_deref().unwrap_or_default())
        .execute(&self.pool)
        .await?;

        // First registrations are reported as Unknown until the device checks in again
        Ok(RegistrationOutcome {
            user_type: UserTier::Unknown,
            time: RegistrationOutcome::FIRST_TIME,
        })
    }

    /// Apply a partial update to the profile of `device_id`.
    pub async fn update_profile_by_device(
        &self,
        device_id: &str,
        changes: &ProfileChanges,
    ) -> Result<UserProfile, AppError> {
        let existing = self
            .get_profile_by_device(device_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", device_id)))?;

        let record = ProfileRecord {
            device_id: existing.device_id.clone(),
            usage_count: changes.usage_count.unwrap_or(existing.usage_count),
            usage_duration: changes.usage_duration.unwrap_or(existing.usage_duration),
            total_distance: changes.total_distance.unwrap_or(existing.total_distance),
            sponsor_amount: changes.sponsor_amount.unwrap_or(existing.sponsor_amount),
            user_type: changes.user_type.unwrap_or(existing.user_type),
            car_model: changes.car_model.clone().unwrap_or(existing.car_model),
            wechat_name: changes.wechat_name.clone().unwrap_or(existing.wechat_name),
        };

        self.update_profile(existing.id, &record).await
    }

    /// Create a profile from the admin form.
    pub async fn create_profile(&self, record: &ProfileRecord) -> Result<UserProfile, AppError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (device_id, usage_count, usage_duration, total_distance, modify_time, sponsor_amount, user_type, car_model, wechat_name) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.device_id)
        .bind(record.usage_count)
        .bind(record.usage_duration)
        .bind(record.total_distance)
        .bind(&now)
        .bind(record.sponsor_amount)
        .bind(i64::from(record.user_type))
        .bind(&record.car_model)
        .bind(&record.wechat_name)
        .execute(&self.pool)
        .await?;

        Ok(profile_from_record(result.last_insert_rowid(), record, now))
    }

    /// Overwrite every mutable column of a profile.
    pub async fn update_profile(
        &self,
        id: i64,
        record: &ProfileRecord,
    ) -> Result<UserProfile, AppError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE users SET device_id = ?, usage_count = ?, usage_duration = ?, total_distance = ?, modify_time = ?, sponsor_amount = ?, user_type = ?, car_model = ?, wechat_name = ? WHERE id = ?",
        )
        .bind(&record.device_id)
        .bind(record.usage_count)
        .bind(record.usage_duration)
        .bind(record.total_distance)
        .bind(&now)
        .bind(record.sponsor_amount)
        .bind(i64::from(record.user_type))
        .bind(&record.car_model)
        .bind(&record.wechat_name)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(profile_from_record(id, record, now))
    }

    /// Delete a profile.
    pub async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        delete_by_id(&self.pool, "users", id, "User").await
    }

    /// Profiles ranked three ways for the public index.
    pub async fn leaderboard(&self) -> Result<Leaderboard, AppError> {
        Ok(Leaderboard {
            by_duration: self.profiles_ordered_by("usage_duration DESC", None).await?,
            by_distance: self.profiles_ordered_by("total_distance DESC", None).await?,
            by_count: self.profiles_ordered_by("usage_count DESC", None).await?,
        })
    }

    // ==================== LOG OPERATIONS ====================

    /// List logs, newest first, optionally capped at `limit` rows.
    pub async fn list_logs(&self, limit: Option<i64>) -> Result<Vec<OperationLog>, AppError> {
        let rows = sqlx::query(
            "SELECT id, device_id, log_time, operation_record FROM logs ORDER BY log_time DESC, id DESC LIMIT ?",
        )
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(log_from_row).collect())
    }

    /// Get a log entry by ID.
    pub async fn get_log(&self, id: i64) -> Result<Option<OperationLog>, AppError> {
        let row =
            sqlx::query("SELECT id, device_id, log_time, operation_record FROM logs WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(log_from_row))
    }

    /// Create a log entry stamped with the current time.
    pub async fn create_log(&self, new: &NewOperationLog) -> Result<OperationLog, AppError> {
        let now = Utc::now().to_rfc3339();

        let result =
            sqlx::query("INSERT INTO logs (device_id, log_time, operation_record) VALUES (?, ?, ?)")
                .bind(&new.device_id)
                .bind(&now)
                .bind(&new.operation_record)
                .execute(&self.pool)
                .await?;

        Ok(OperationLog {
            id: result.last_insert_rowid(),
            device_id: new.device_id.clone(),
            log_time: now,
            operation_record: new.operation_record.clone(),
        })
    }

    /// Rewrite a log entry; the log time is refreshed.
    pub async fn update_log(
        &self,
        id: i64,
        new: &NewOperationLog,
    ) -> Result<OperationLog, AppError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE logs SET device_id = ?, operation_record = ?, log_time = ? WHERE id = ?",
        )
        .bind(&new.device_id)
        .bind(&new.operation_record)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Log {} not found", id)));
        }

        Ok(OperationLog {
            id,
            device_id: new.device_id.clone(),
            log_time: now,
            operation_record: new.operation_record.clone(),
        })
    }

    /// Delete a log entry.
    pub async fn delete_log(&self, id: i64) -> Result<(), AppError> {
        delete_by_id(&self.pool, "logs", id, "Log").await
    }

    // ==================== VIDEO OPERATIONS ====================

    /// List all videos in insertion order.
    pub async fn list_videos(&self) -> Result<Vec<Video>, AppError> {
        let rows = sqlx::query("SELECT id, video_title, video_link FROM videos ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(video_from_row).collect())
    }

    /// Get a video by ID.
    pub async fn get_video(&self, id: i64) -> Result<Option<Video>, AppError> {
        let row = sqlx::query("SELECT id, video_title, video_link FROM videos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(video_from_row))
    }

    pub async fn create_video(&self, new: &NewVideo) -> Result<Video, AppError> {
        let result = sqlx::query("INSERT INTO videos (video_title, video_link) VALUES (?, ?)")
            .bind(&new.video_title)
            .bind(&new.video_link)
            .execute(&self.pool)
            .await?;

        Ok(Video {
            id: result.last_insert_rowid(),
            video_title: new.video_title.clone(),
            video_link: new.video_link.clone(),
        })
    }

    pub async fn update_video(&self, id: i64, new: &NewVideo) -> Result<Video, AppError> {
        let result = sqlx::query("UPDATE videos SET video_title = ?, video_link = ? WHERE id = ?")
            .bind(&new.video_title)
            .bind(&new.video_link)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Video {} not found", id)));
        }

        Ok(Video {
            id,
            video_title: new.video_title.clone(),
            video_link: new.video_link.clone(),
        })
    }

    pub async fn delete_video(&self, id: i64) -> Result<(), AppError> {
        delete_by_id(&self.pool, "videos", id, "Video").await
    }

    // ==================== DASHBOARD ====================

    /// Row counts plus the five most recent profiles and logs.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        let counts = sqlx::query(
            "SELECT (SELECT COUNT(*) FROM users) AS users_count, (SELECT COUNT(*) FROM logs) AS logs_count, (SELECT COUNT(*) FROM videos) AS videos_count",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            users_count: counts.get("users_count"),
            logs_count: counts.get("logs_count"),
            videos_count: counts.get("videos_count"),
            recent_users: self.profiles_ordered_by("modify_time DESC", Some(5)).await?,
            recent_logs: self.list_logs(Some(5)).await?,
        })
    }

    /// Populate an empty database with a few demo rows. Returns whether anything was added.
    pub async fn seed_demo_data(&self) -> Result<bool, AppError> {
        let stats = self.dashboard_stats().await?;
        let mut seeded = false;

        if stats.users_count == 0 {
            let demo_users = [
                ("DEVICE001", 25, 45.5, 1200.0, 100.0, UserTier::Supporter, "Tesla Model 3"),
                ("DEVICE002", 18, 32.8, 850.0, 50.0, UserTier::New, "BYD Han EV"),
                ("DEVICE003", 35, 68.2, 2100.0, 200.0, UserTier::Sponsor, "NIO ES6"),
                ("DEVICE004", 12, 18.5, 450.0, 25.0, UserTier::Unknown, "XPeng P7"),
                ("DEVICE005", 42, 85.3, 3200.0, 300.0, UserTier::Loyal, "Li Auto ONE"),
            ];
            for (device_id, count, duration, distance, sponsor, tier, car) in demo_users {
                self.create_profile(&ProfileRecord {
                    device_id: device_id.to_string(),
                    usage_count: count,
                    usage_duration: duration,
                    total_distance: distance,
                    sponsor_amount: sponsor,
                    user_type: tier,
                    car_model: car.to_string(),
                    wechat_name: format!("{} owner", car),
                })
                .await?;
            }

            let demo_logs = [
                ("DEVICE001", "App started, navigation began"),
                ("DEVICE002", "Completed a 150 km trip"),
                ("DEVICE003", "Used voice control"),
                ("DEVICE004", "First login, device bound"),
                ("DEVICE005", "Shared driving data"),
            ];
            for (device_id, record) in demo_logs {
                self.create_log(&NewOperationLog {
                    device_id: device_id.to_string(),
                    operation_record: record.to_string(),
                })
                .await?;
            }
            seeded = true;
        }

        if stats.videos_count == 0 {
            let demo_videos = [
                ("Getting started", "https://example.com/video1"),
                ("Voice control walkthrough", "https://example.com/video2"),
                ("Safe driving tips", "https://example.com/video3"),
            ];
            for (title, link) in demo_videos {
                self.create_video(&NewVideo {
                    video_title: title.to_string(),
                    video_link: link.to_string(),
                })
                .await?;
            }
            seeded = true;
        }

        Ok(seeded)
    }
}

async fn delete_by_id(pool: &SqlitePool, table: &str, id: i64, label: &str) -> Result<(), AppError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("{} {} not found", label, id)));
    }
    Ok(())
}

// Helper functions for row conversion. Legacy rows may hold NULLs in defaulted columns.

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> UserProfile {
    let usage_count: Option<i64> = row.get("usage_count");
    let usage_duration: Option<f64> = row.get("usage_duration");
    let total_distance: Option<f64> = row.get("total_distance");
    let modify_time: Option<String> = row.get("modify_time");
    let sponsor_amount: Option<f64> = row.get("sponsor_amount");
    let user_type: Option<i64> = row.get("user_type");
    let car_model: Option<String> = row.get("car_model");
    let wechat_name: Option<String> = row.get("wechat_name");
    UserProfile {
        id: row.get("id"),
        device_id: row.get("device_id"),
        usage_count: usage_count.unwrap_or(0),
        usage_duration: usage_duration.unwrap_or(0.0),
        total_distance: total_distance.unwrap_or(0.0),
        modify_time: modify_time.unwrap_or_default(),
        sponsor_amount: sponsor_amount.unwrap_or(0.0),
        user_type: UserTier::from_stored(user_type.unwrap_or(0)),
        car_model: car_model.unwrap_or_default(),
        wechat_name: wechat_name.unwrap_or_default(),
    }
}

fn profile_from_record(id: i64, record: &ProfileRecord, modify_time: String) -> UserProfile {
    UserProfile {
        id,
        device_id: record.device_id.clone(),
        usage_count: record.usage_count,
        usage_duration: record.usage_duration,
        total_distance: record.total_distance,
        modify_time,
        sponsor_amount: record.sponsor_amount,
        user_type: record.user_type,
        car_model: record.car_model.clone(),
        wechat_name: record.wechat_name.clone(),
    }
}

fn log_from_row(row: &sqlx::sqlite::SqliteRow) -> OperationLog {
    let log_time: Option<String> = row.get("log_time");
    OperationLog {
        id: row.get("id"),
        device_id: row.get("device_id"),
        log_time: log_time.unwrap_or_default(),
        operation_record: row.get("operation_record"),
    }
}

fn video_from_row(row: &sqlx::sqlite::SqliteRow) -> Video {
    Video {
        id: row.get("id"),
        video_title: row.get("video_title"),
        video_link: row.get("video_link"),
    }
}
