//! Repository for the feedback service: feedback, APK versions, donations.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{ApkVersion, Donation, Feedback, NewApkVersion, NewDonation, NewFeedback};

/// Database repository for the feedback service.
#[derive(Clone)]
pub struct FeedbackRepository {
    pool: SqlitePool,
}

impl FeedbackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== FEEDBACK OPERATIONS ====================

    /// List all feedback, newest first.
    pub async fn list_feedback(&self) -> Result<Vec<Feedback>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, time, feedback, images, note, created_at FROM feedback ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(feedback_from_row).collect())
    }

    /// Get a feedback entry by ID.
    pub async fn get_feedback(&self, id: i64) -> Result<Option<Feedback>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, time, feedback, images, note, created_at FROM feedback WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(feedback_from_row))
    }

    /// Store a new feedback submission.
    pub async fn create_feedback(&self, new: &NewFeedback) -> Result<Feedback, AppError> {
        let now = Utc::now().to_rfc3339();
        let images_json = serde_json::to_string(&new.images)?;

        let result = sqlx::query(
            "INSERT INTO feedback (user_id, time, feedback, images, note, created_at) VALUES (?, ?, ?, ?, '', ?)",
        )
        .bind(&new.user_id)
        .bind(&new.time)
        .bind(&new.feedback)
        .bind(&images_json)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Feedback {
            id: result.last_insert_rowid(),
            user_id: new.user_id.clone(),
            time: new.time.clone(),
            feedback: new.feedback.clone(),
            images: new.images.clone(),
            note: String::new(),
            created_at: now,
        })
    }

    /// Replace the admin note on a feedback entry.
    pub async fn update_note(&self, id: i64, note: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE feedback SET note = ? WHERE id = ?")
            .bind(note)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Feedback {} not found", id)));
        }
        Ok(())
    }

    /// Delete a feedback entry and return it so its images can be removed.
    pub async fn delete_feedback(&self, id: i64) -> Result<Feedback, AppError> {
        let existing = self
            .get_feedback(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Feedback {} not found", id)))?;

        sqlx::query("DELETE FROM feedback WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }

    // ==================== APK VERSION OPERATIONS ====================

    /// List all versions, newest first.
    pub async fn list_apk_versions(&self) -> Result<Vec<ApkVersion>, AppError> {
        let rows = sqlx::query(
            "SELECT id, version_code, version_name, update_notes, download_url, file_size, upload_time, is_active FROM apk_versions ORDER BY upload_time DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(apk_version_from_row).collect())
    }

    /// The newest active version, if any.
    pub async fn latest_active_apk_version(&self) -> Result<Option<ApkVersion>, AppError> {
        let row = sqlx::query(
            "SELECT id, version_code, version_name, update_notes, download_url, file_size, upload_time, is_active FROM apk_versions WHERE is_active = 1 ORDER BY upload_time DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(apk_version_from_row))
    }

    /// Insert a version as the only active one.
    ///
    /// Clearing the old flags and inserting happen in one transaction, so a
    /// failed insert (e.g. duplicate version code) leaves the previous version active.
    pub async fn activate_apk_version(&self, new: &NewApkVersion) -> Result<ApkVersion, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE apk_versions SET is_active = 0 WHERE is_active != 0")
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            "INSERT INTO apk_versions (version_code, version_name, update_notes, download_url, file_size, upload_time, is_active) VALUES (?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(&new.version_code)
        .bind(&new.version_name)
        .bind(&new.update_notes)
        .bind(&new.download_url)
        .bind(new.file_size)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ApkVersion {
            id: result.last_insert_rowid(),
            version_code: new.version_code.clone(),
            version_name: Some(new.version_name.clone()),
            update_notes: new.update_notes.clone(),
            download_url: new.download_url.clone(),
            file_size: new.file_size,
            upload_time: now,
            is_active: true,
        })
    }

    /// Delete a version.
    pub async fn delete_apk_version(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM apk_versions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("APK version {} not found", id)));
        }
        Ok(())
    }

    // ==================== DONATION OPERATIONS ====================

    /// Record a donation, replacing any earlier one from the same device.
    pub async fn record_donation(&self, new: &NewDonation) -> Result<Donation, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        if let Some(device_id) = &new.device_id {
            let replaced = sqlx::query("DELETE FROM donations WHERE device_id = ?")
                .bind(device_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if replaced > 0 {
                tracing::debug!(device_id = %device_id, replaced, "Replacing earlier donation");
            }
        }

        let result =
            sqlx::query("INSERT INTO donations (amount, device_id, created_at) VALUES (?, ?, ?)")
                .bind(new.amount)
                .bind(&new.device_id)
                .bind(&now)
                .execute(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(Donation {
            id: result.last_insert_rowid(),
            amount: new.amount,
            device_id: new.device_id.clone(),
            created_at: now,
        })
    }

    /// List donations newest first, optionally capped at `limit` rows.
    pub async fn list_donations(&self, limit: Option<i64>) -> Result<Vec<Donation>, AppError> {
        // SQLite treats a negative LIMIT as unbounded
        let rows = sqlx::query(
            "SELECT id, amount, device_id, created_at FROM donations ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(donation_from_row).collect())
    }

    /// Delete a donation.
    pub async fn delete_donation(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM donations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Donation {} not found", id)));
        }
        Ok(())
    }
}

// Helper functions for row conversion

fn feedback_from_row(row: &sqlx::sqlite::SqliteRow) -> Feedback {
    let images_str: Option<String> = row.get("images");
    let note: Option<String> = row.get("note");
    Feedback {
        id: row.get("id"),
        user_id: row.get("user_id"),
        time: row.get("time"),
        feedback: row.get("feedback"),
        images: images_str.map(|s| parse_json_array(&s)).unwrap_or_default(),
        note: note.unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}

fn apk_version_from_row(row: &sqlx::sqlite::SqliteRow) -> ApkVersion {
    let is_active: i64 = row.get("is_active");
    let file_size: Option<i64> = row.get("file_size");
    ApkVersion {
        id: row.get("id"),
        version_code: row.get("version_code"),
        version_name: row.get("version_name"),
        update_notes: row.get("update_notes"),
        download_url: row.get("download_url"),
        file_size: file_size.unwrap_or(0),
        upload_time: row.get("upload_time"),
        is_active: is_active != 0,
    }
}

fn donation_from_row(row: &sqlx::sqlite::SqliteRow) -> Donation {
    Donation {
        id: row.get("id"),
        amount: row.get("amount"),
        device_id: row.get("device_id"),
        created_at: row.get("created_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
