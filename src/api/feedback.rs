//! Feedback API endpoints.

use axum::extract::{multipart::MultipartRejection, Multipart, Path, State};
use chrono::Utc;

use super::{required, success, success_list, ApiResponse, ApiResult, JsonOrForm};
use crate::errors::AppError;
use crate::models::{Feedback, NewFeedback, UpdateNoteRequest};
use crate::uploads;
use crate::FeedbackState;

/// POST /api/feedback - Submit feedback with optional images (multipart).
pub async fn submit_feedback(
    State(state): State<FeedbackState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Feedback> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut user_id = None;
    let mut time = None;
    let mut text = None;
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if filename.is_empty() || bytes.is_empty() {
                    continue;
                }
                if !uploads::allowed_image(&filename) {
                    tracing::warn!(file = %filename, "Skipping upload with disallowed extension");
                    continue;
                }
                images.push((filename, bytes));
            }
            "id" | "time" | "feedback" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                match name.as_str() {
                    "id" => user_id = Some(value),
                    "time" => time = Some(value),
                    _ => text = Some(value),
                }
            }
            _ => {}
        }
    }

    let user_id = required(user_id, "id")?;
    let time = required(time, "time")?;
    let text = required(text, "feedback")?;

    let upload_dir = &state.config.upload_dir;
    let timestamp = Utc::now().timestamp_millis();
    let mut stored = Vec::with_capacity(images.len());
    for (index, (filename, bytes)) in images.iter().enumerate() {
        let name = uploads::stored_name(&user_id, timestamp, index, filename);
        if let Err(e) = uploads::save_image(upload_dir, &name, bytes).await {
            uploads::remove_images(upload_dir, &stored).await;
            return Err(e.into());
        }
        stored.push(name);
    }

    let new = NewFeedback {
        user_id,
        time,
        feedback: text,
        images: stored,
    };

    match state.repo.create_feedback(&new).await {
        Ok(feedback) => {
            tracing::info!(
                id = feedback.id,
                user_id = %feedback.user_id,
                images = feedback.images.len(),
                "Feedback submitted"
            );
            Ok(ApiResponse::new(feedback).with_message("Feedback submitted"))
        }
        Err(e) => {
            uploads::remove_images(upload_dir, &new.images).await;
            Err(e)
        }
    }
}

/// GET /api/feedback - List all feedback, newest first.
pub async fn list_feedback(State(state): State<FeedbackState>) -> ApiResult<Vec<Feedback>> {
    success_list(state.repo.list_feedback().await?)
}

/// GET /admin - Admin panel data: every feedback entry.
pub async fn admin_feedback(State(state): State<FeedbackState>) -> ApiResult<Vec<Feedback>> {
    success_list(state.repo.list_feedback().await?)
}

/// POST /admin/delete/:id - Delete feedback and its stored images.
pub async fn delete_feedback(
    State(state): State<FeedbackState>,
    Path(id): Path<i64>,
) -> ApiResult {
    let removed = state.repo.delete_feedback(id).await?;
    uploads::remove_images(&state.config.upload_dir, &removed.images).await;

    tracing::info!(id, images = removed.images.len(), "Feedback deleted");
    Ok(ApiResponse::message("Feedback deleted"))
}

/// POST /admin/update_note/:id - Set the admin note of a feedback entry.
pub async fn update_note(
    State(state): State<FeedbackState>,
    Path(id): Path<i64>,
    JsonOrForm(request): JsonOrForm<UpdateNoteRequest>,
) -> ApiResult<Feedback> {
    let note = request.note.unwrap_or_default();
    state.repo.update_note(id, &note).await?;

    let feedback = state
        .repo
        .get_feedback(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Feedback {} not found", id)))?;

    tracing::info!(id, "Feedback note updated");
    success(feedback).map(|r| r.with_message("Note updated"))
}
