//! Video catalog API endpoints.

use axum::extract::{Path, State};

use super::{success, success_list, ApiResponse, ApiResult, JsonOrForm};
use crate::errors::AppError;
use crate::models::{Video, VideoForm};
use crate::UsageState;

/// GET /api/videos and GET /admin/videos - The whole catalog.
pub async fn list_videos(State(state): State<UsageState>) -> ApiResult<Vec<Video>> {
    success_list(state.repo.list_videos().await?)
}

/// GET /api/videos/:id - A single video.
pub async fn get_video(State(state): State<UsageState>, Path(id): Path<i64>) -> ApiResult<Video> {
    let video = state
        .repo
        .get_video(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))?;

    success(video)
}

/// POST /admin/videos/add
pub async fn add_video(
    State(state): State<UsageState>,
    JsonOrForm(form): JsonOrForm<VideoForm>,
) -> ApiResult<Video> {
    let new = form.validate()?;
    let video = state.repo.create_video(&new).await?;

    tracing::info!(id = video.id, "Video added");
    Ok(ApiResponse::new(video).with_message("Video added"))
}

/// POST /admin/videos/edit/:id
pub async fn edit_video(
    State(state): State<UsageState>,
    Path(id): Path<i64>,
    JsonOrForm(form): JsonOrForm<VideoForm>,
) -> ApiResult<Video> {
    let new = form.validate()?;
    let video = state.repo.update_video(id, &new).await?;

    tracing::info!(id, "Video edited");
    Ok(ApiResponse::new(video).with_message("Video updated"))
}

/// POST /admin/videos/delete/:id
pub async fn delete_video(State(state): State<UsageState>, Path(id): Path<i64>) -> ApiResult {
    state.repo.delete_video(id).await?;

    tracing::info!(id, "Video deleted");
    Ok(ApiResponse::message("Video deleted"))
}
